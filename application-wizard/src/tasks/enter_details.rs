use async_trait::async_trait;
use tracing::{debug, info};
use wizard_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};

use super::utils::{load_draft, reject, save_draft, set_message, set_step, stay, take_event};
use crate::models::{WizardEvent, WizardStep};
use crate::validation::{check_field_updates, missing_fields};

/// Second step: fill in the field set of the chosen insurance type
pub struct EnterDetailsTask;

#[async_trait]
impl Task for EnterDetailsTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let event = take_event(&context).await?;
        let mut draft = load_draft(&context).await;
        let insurance_type = draft
            .selection
            .ok_or_else(|| GraphError::ContextError("no insurance type selected".to_string()))?;

        match event {
            WizardEvent::SelectType { insurance_type } => {
                draft.select(insurance_type);
                save_draft(&context, &draft).await?;
                set_message(&context, None).await?;
                info!(insurance_type = %insurance_type, "insurance type changed, details cleared");
                Ok(stay(
                    format!("{} selected", insurance_type.display_name()),
                    "Collecting application details",
                ))
            }
            WizardEvent::UpdateFields { values } => {
                if let Err(e) = check_field_updates(insurance_type, &values) {
                    return reject(&context, e.to_string()).await;
                }
                debug!(fields = values.len(), "updating fields");
                draft.values.extend(values);
                save_draft(&context, &draft).await?;
                set_message(&context, None).await?;
                Ok(stay(
                    "Details updated".to_string(),
                    "Collecting application details",
                ))
            }
            WizardEvent::ContinueToDocuments => {
                let missing = missing_fields(insurance_type, &draft.values);
                if !missing.is_empty() {
                    return reject(
                        &context,
                        format!("Please fill in all required fields: {}", missing.join(", ")),
                    )
                    .await;
                }
                set_step(&context, WizardStep::UploadingDocuments).await?;
                set_message(&context, None).await?;
                info!(insurance_type = %insurance_type, "details complete");
                Ok(TaskResult::new_with_status(
                    Some("Details complete, upload your documents".to_string()),
                    NextAction::Continue,
                    Some("Collecting documents".to_string()),
                ))
            }
            other => {
                reject(
                    &context,
                    format!("'{}' is not available while entering details", other.name()),
                )
                .await
            }
        }
    }
}
