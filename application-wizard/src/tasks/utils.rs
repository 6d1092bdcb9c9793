use wizard_flow::{Context, GraphError, NextAction, Result, TaskResult};

use super::session_keys;
use crate::models::{ApplicationDraft, WizardEvent, WizardStep};

/// Remove and return the event this run should handle
pub async fn take_event(context: &Context) -> Result<WizardEvent> {
    let raw = context
        .remove(session_keys::EVENT)
        .await
        .ok_or_else(|| GraphError::ContextError("no wizard event to handle".to_string()))?;
    serde_json::from_value(raw)
        .map_err(|e| GraphError::ContextError(format!("malformed wizard event: {e}")))
}

pub async fn load_draft(context: &Context) -> ApplicationDraft {
    context.get(session_keys::DRAFT).await.unwrap_or_default()
}

pub async fn save_draft(context: &Context, draft: &ApplicationDraft) -> Result<()> {
    context.set(session_keys::DRAFT, draft).await
}

pub async fn current_step(context: &Context) -> WizardStep {
    context
        .get(session_keys::STEP)
        .await
        .unwrap_or(WizardStep::SelectingType)
}

pub async fn set_step(context: &Context, step: WizardStep) -> Result<()> {
    context.set(session_keys::STEP, step).await
}

/// Replace the inline message; `None` clears it
pub async fn set_message(context: &Context, message: Option<String>) -> Result<()> {
    context.set(session_keys::MESSAGE, message).await
}

/// Report an inline validation error and stay on the current task
pub async fn reject(context: &Context, message: String) -> Result<TaskResult> {
    set_message(context, Some(message.clone())).await?;
    Ok(TaskResult::new_with_status(
        Some(message),
        NextAction::WaitForInput,
        Some("Input rejected".to_string()),
    ))
}

pub fn stay(response: String, status: &str) -> TaskResult {
    TaskResult::new_with_status(
        Some(response),
        NextAction::WaitForInput,
        Some(status.to_string()),
    )
}
