use async_trait::async_trait;
use tracing::info;
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::utils::{load_draft, reject, save_draft, set_message, set_step, take_event};
use crate::models::{WizardEvent, WizardStep};

/// First step: the user picks life, car, or bike insurance
pub struct SelectTypeTask;

#[async_trait]
impl Task for SelectTypeTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let event = take_event(&context).await?;

        let insurance_type = match event {
            WizardEvent::SelectType { insurance_type } => insurance_type,
            other => {
                return reject(
                    &context,
                    format!("Choose an insurance type before '{}'", other.name()),
                )
                .await;
            }
        };

        let mut draft = load_draft(&context).await;
        draft.select(insurance_type);
        save_draft(&context, &draft).await?;
        set_step(&context, WizardStep::EnteringDetails).await?;
        set_message(&context, None).await?;

        info!(
            task_id = %self.id(),
            insurance_type = %insurance_type,
            "insurance type selected"
        );

        Ok(TaskResult::new_with_status(
            Some(format!("{} selected", insurance_type.display_name())),
            NextAction::Continue,
            Some("Collecting application details".to_string()),
        ))
    }
}
