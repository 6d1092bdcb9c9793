use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::{error, info};
use wizard_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};

use super::{
    UploadDocumentsTask, session_keys,
    utils::{current_step, load_draft, set_message, set_step},
};
use crate::clients::WalletConnection;
use crate::models::{Celebration, WizardStep};
use crate::submission::SubmissionServices;
use crate::validation::is_ready_for_submission;

const SUCCESS_MESSAGE: &str = "Application submitted successfully!";

/// Runs the submission protocol. On failure the session goes back to the
/// upload step so the user can retry from the beginning.
pub struct SubmitApplicationTask {
    services: SubmissionServices,
    celebration: TimeDelta,
}

impl SubmitApplicationTask {
    pub fn new(services: SubmissionServices, celebration: TimeDelta) -> Self {
        Self {
            services,
            celebration,
        }
    }
}

#[async_trait]
impl Task for SubmitApplicationTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        // The upload step already consumed the submit event; anything still
        // here arrived after completion and is ignored.
        context.remove(session_keys::EVENT).await;

        if current_step(&context).await == WizardStep::Completed {
            return Ok(TaskResult::new_with_status(
                Some("This application has already been submitted.".to_string()),
                NextAction::End,
                Some("Application submitted".to_string()),
            ));
        }

        let draft = load_draft(&context).await;
        if !is_ready_for_submission(&draft) {
            return Err(GraphError::TaskExecutionFailed(
                "draft is incomplete and cannot be submitted".to_string(),
            ));
        }

        let wallet: WalletConnection = context
            .get(session_keys::WALLET)
            .await
            .unwrap_or_else(|| WalletConnection::Unavailable {
                reason: "wallet was never connected".to_string(),
            });

        set_step(&context, WizardStep::Submitting).await?;
        info!(
            task_id = %self.id(),
            attachments = draft.attachments.len(),
            "starting submission"
        );

        let report = self.services.submit(&draft, &wallet).await;
        context.set(session_keys::LAST_SUBMISSION, &report).await?;

        match &report.error {
            None => {
                set_step(&context, WizardStep::Completed).await?;
                set_message(&context, None).await?;
                context
                    .set(
                        session_keys::CELEBRATION,
                        Celebration::starting_at(SUCCESS_MESSAGE, Utc::now(), self.celebration),
                    )
                    .await?;
                info!(documents = report.receipts.len(), "application submitted");
                Ok(TaskResult::new_with_status(
                    Some(SUCCESS_MESSAGE.to_string()),
                    NextAction::End,
                    Some("Application submitted".to_string()),
                ))
            }
            Some(message) => {
                error!(
                    application_saved = report.application_saved,
                    failed_attachment = ?report.failed_attachment,
                    error = %message,
                    "submission failed"
                );
                set_step(&context, WizardStep::UploadingDocuments).await?;
                set_message(&context, Some(format!("Error submitting the form: {message}"))).await?;
                Ok(TaskResult::new_with_status(
                    Some(message.clone()),
                    NextAction::GoTo(UploadDocumentsTask.id().to_string()),
                    Some("Submission failed, waiting for retry".to_string()),
                ))
            }
        }
    }
}
