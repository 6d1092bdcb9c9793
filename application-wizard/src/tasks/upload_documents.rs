use async_trait::async_trait;
use tracing::{info, warn};
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::utils::{load_draft, reject, save_draft, set_message, set_step, stay, take_event};
use crate::models::{DocumentAttachment, WizardEvent, WizardStep};
use crate::validation::check_attachment;

/// Third step: collect supporting documents, then hand over to submission
pub struct UploadDocumentsTask;

#[async_trait]
impl Task for UploadDocumentsTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let event = take_event(&context).await?;
        let mut draft = load_draft(&context).await;

        match event {
            WizardEvent::AttachDocuments { files } => {
                let mut accepted = 0;
                let mut last_rejection = None;
                for file in files {
                    match check_attachment(&file.media_type, file.content.len()) {
                        Ok(()) => {
                            draft.attachments.push(DocumentAttachment::from(file));
                            accepted += 1;
                        }
                        Err(rejection) => {
                            warn!(
                                file_name = %file.file_name,
                                media_type = %file.media_type,
                                size = file.content.len(),
                                "attachment rejected"
                            );
                            last_rejection = Some(rejection.to_string());
                        }
                    }
                }
                save_draft(&context, &draft).await?;
                set_message(&context, last_rejection.clone()).await?;
                info!(accepted, total = draft.attachments.len(), "documents attached");

                let response = last_rejection
                    .unwrap_or_else(|| format!("{accepted} document(s) attached"));
                Ok(stay(response, "Collecting documents"))
            }
            WizardEvent::RemoveDocument { index } => {
                if index >= draft.attachments.len() {
                    return reject(&context, format!("No document at position {index}")).await;
                }
                let removed = draft.attachments.remove(index);
                save_draft(&context, &draft).await?;
                set_message(&context, None).await?;
                Ok(stay(
                    format!("Removed {}", removed.file_name),
                    "Collecting documents",
                ))
            }
            WizardEvent::Submit => {
                if draft.attachments.is_empty() {
                    return reject(
                        &context,
                        "Attach at least one document before submitting".to_string(),
                    )
                    .await;
                }
                set_step(&context, WizardStep::Submitting).await?;
                set_message(&context, None).await?;
                Ok(TaskResult::new_with_status(
                    None,
                    NextAction::ContinueAndExecute,
                    Some("Submitting application".to_string()),
                ))
            }
            other => {
                reject(
                    &context,
                    format!("'{}' is not available while uploading documents", other.name()),
                )
                .await
            }
        }
    }
}
