//! The three-phase submission: save the draft, then pin and record each
//! attachment on the ledger, one at a time, in attachment order.
//!
//! Nothing is rolled back. A failure while handling attachment `i` stops the
//! run before attachment `i + 1`; the saved draft and any pinned files or
//! mined transactions stay as they are and are listed in the report.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    clients::{
        ApplicationSubmission, ApplicationsApi, Ledger, PinningService, StoreDocumentCall,
        WalletConnection,
    },
    encoding::EncodedReference,
    models::{
        ApplicationDraft, DocumentAttachment, RECIPIENT_PLACEHOLDER, SubmissionReceipt,
        SubmissionReport, TransactionOutcome,
    },
};

pub const NO_WALLET_ACCOUNT: &str = "No wallet account available";

#[derive(Clone)]
pub struct SubmissionServices {
    pub api: Arc<dyn ApplicationsApi>,
    pub pinning: Arc<dyn PinningService>,
    pub ledger: Arc<dyn Ledger>,
    /// Key stored next to every document reference on the ledger
    pub shared_key: String,
}

impl SubmissionServices {
    /// Run the whole protocol for `draft`. Never returns early with an error:
    /// every failure is recorded in the report.
    pub async fn submit(
        &self,
        draft: &ApplicationDraft,
        wallet: &WalletConnection,
    ) -> SubmissionReport {
        let mut report = SubmissionReport::default();

        let Some(insurance_type) = draft.selection else {
            report.error = Some("Choose an insurance type before submitting".to_string());
            return report;
        };

        let submission = ApplicationSubmission {
            insurance_type,
            form_data: draft.values.clone(),
            recipient_address: RECIPIENT_PLACEHOLDER.to_string(),
        };
        match self.api.save_application(&submission).await {
            Ok(message) => {
                info!(insurance_type = %insurance_type, message = %message, "application saved");
                report.application_saved = true;
            }
            Err(e) => {
                error!(error = %e, "saving application failed, skipping document upload");
                report.error = Some(e.to_string());
                return report;
            }
        }

        for (index, attachment) in draft.attachments.iter().enumerate() {
            if let Err(message) = self
                .submit_attachment(index, attachment, wallet, &mut report)
                .await
            {
                warn!(
                    attachment_index = index,
                    remaining = draft.attachments.len() - index - 1,
                    error = %message,
                    "document submission failed, stopping"
                );
                report.failed_attachment = Some(index);
                report.error = Some(message);
                break;
            }
        }

        report
    }

    async fn submit_attachment(
        &self,
        index: usize,
        attachment: &DocumentAttachment,
        wallet: &WalletConnection,
        report: &mut SubmissionReport,
    ) -> Result<(), String> {
        let content_address = self
            .pinning
            .pin_file(
                &attachment.file_name,
                &attachment.media_type,
                &attachment.content,
            )
            .await
            .map_err(|e| format!("Failed to upload {}: {e}", attachment.file_name))?;

        let encoded = EncodedReference::from_content_address(&content_address, &self.shared_key);

        let transaction = match wallet.first_account() {
            None => TransactionOutcome::Rejected {
                reason: NO_WALLET_ACCOUNT.to_string(),
            },
            Some(from) => {
                let call = StoreDocumentCall {
                    recipient: RECIPIENT_PLACEHOLDER.to_string(),
                    encrypted_link: encoded.link.clone(),
                    encrypted_key: encoded.key.clone(),
                };
                self.ledger
                    .store_document(from, &call)
                    .await
                    .unwrap_or_else(|e| TransactionOutcome::Rejected {
                        reason: e.to_string(),
                    })
            }
        };

        let failure = match &transaction {
            TransactionOutcome::Mined { tx_hash, .. } => {
                info!(
                    attachment_index = index,
                    content_address = %content_address,
                    tx_hash = %tx_hash,
                    "document recorded on ledger"
                );
                None
            }
            TransactionOutcome::Rejected { reason } => Some(format!(
                "Failed to record {} on the ledger: {reason}",
                attachment.file_name
            )),
        };

        report.receipts.push(SubmissionReceipt {
            attachment_index: index,
            file_name: attachment.file_name.clone(),
            content_address,
            encoded,
            transaction,
        });

        match failure {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}
