use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Zero address used as the on-chain recipient for every stored document.
pub const RECIPIENT_PLACEHOLDER: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceType {
    Life,
    Car,
    Bike,
}

impl InsuranceType {
    pub const ALL: [InsuranceType; 3] = [InsuranceType::Life, InsuranceType::Car, InsuranceType::Bike];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceType::Life => "life",
            InsuranceType::Car => "car",
            InsuranceType::Bike => "bike",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            InsuranceType::Life => "Life Insurance",
            InsuranceType::Car => "Car Insurance",
            InsuranceType::Bike => "Bike Insurance",
        }
    }

    /// The ordered, all-mandatory fields collected for this kind of policy
    pub fn field_set(&self) -> &'static [FieldSpec] {
        match self {
            InsuranceType::Life => LIFE_FIELDS,
            InsuranceType::Car => CAR_FIELDS,
            InsuranceType::Bike => BIKE_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.field_set().iter().find(|field| field.name == name)
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
    }
}

const fn date(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Date,
    }
}

const LIFE_FIELDS: &[FieldSpec] = &[
    text("Full Name"),
    date("Date of Birth"),
    text("Occupation"),
    text("Annual Income"),
];

const CAR_FIELDS: &[FieldSpec] = &[
    text("Vehicle Model"),
    text("Vehicle Year"),
    text("Registration Number"),
    text("Vehicle Value"),
];

const BIKE_FIELDS: &[FieldSpec] = &[
    text("Bike Model"),
    text("Bike Year"),
    text("Registration Number"),
    text("Bike Value"),
];

/// A file accepted into the draft. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAttachment {
    pub file_name: String,
    pub media_type: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl DocumentAttachment {
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn summary(&self, index: usize) -> AttachmentSummary {
        AttachmentSummary {
            index,
            file_name: self.file_name.clone(),
            media_type: self.media_type.clone(),
            size: self.size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSummary {
    pub index: usize,
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
}

/// The in-memory application being filled in. It has no identity until the
/// applications API stores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub selection: Option<InsuranceType>,
    pub values: BTreeMap<String, String>,
    pub attachments: Vec<DocumentAttachment>,
}

impl ApplicationDraft {
    /// Pick (or re-pick) the insurance type. Field values belong to a single
    /// selection, so they are always cleared.
    pub fn select(&mut self, insurance_type: InsuranceType) {
        self.selection = Some(insurance_type);
        self.values.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectingType,
    EnteringDetails,
    UploadingDocuments,
    Submitting,
    Completed,
}

impl WizardStep {
    /// Position on the three-step progress indicator
    pub fn step_number(&self) -> u8 {
        match self {
            WizardStep::SelectingType => 1,
            WizardStep::EnteringDetails => 2,
            WizardStep::UploadingDocuments | WizardStep::Submitting | WizardStep::Completed => 3,
        }
    }
}

/// Content address returned by the pinning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(pub String);

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Mined {
        tx_hash: String,
        block_number: Option<u64>,
    },
    Rejected {
        reason: String,
    },
}

impl TransactionOutcome {
    pub fn is_mined(&self) -> bool {
        matches!(self, TransactionOutcome::Mined { .. })
    }
}

/// Result of the pin + ledger phase for one attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub attachment_index: usize,
    pub file_name: String,
    pub content_address: ContentAddress,
    pub encoded: crate::encoding::EncodedReference,
    pub transaction: TransactionOutcome,
}

/// What one submission attempt achieved. Partial success is kept so the user
/// can see which side effects already happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub application_saved: bool,
    pub receipts: Vec<SubmissionReceipt>,
    pub failed_attachment: Option<usize>,
    pub error: Option<String>,
}

impl SubmissionReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Celebration {
    pub message: String,
    pub until: DateTime<Utc>,
}

impl Celebration {
    /// Start a celebration at `now` lasting `duration`; a window past the
    /// representable range is capped at the latest instant.
    pub fn starting_at(message: impl Into<String>, now: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self {
            message: message.into(),
            until: now
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}

/// A file as it arrives from the client, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub media_type: String,
    #[serde(rename = "content_base64", with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl From<UploadedFile> for DocumentAttachment {
    fn from(file: UploadedFile) -> Self {
        Self {
            file_name: file.file_name,
            media_type: file.media_type,
            content: file.content,
        }
    }
}

/// One user interaction with the wizard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WizardEvent {
    SelectType { insurance_type: InsuranceType },
    UpdateFields { values: BTreeMap<String, String> },
    ContinueToDocuments,
    AttachDocuments { files: Vec<UploadedFile> },
    RemoveDocument { index: usize },
    Submit,
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::SelectType { .. } => "select_type",
            WizardEvent::UpdateFields { .. } => "update_fields",
            WizardEvent::ContinueToDocuments => "continue_to_documents",
            WizardEvent::AttachDocuments { .. } => "attach_documents",
            WizardEvent::RemoveDocument { .. } => "remove_document",
            WizardEvent::Submit => "submit",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

/// Everything a client needs to render the wizard
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: String,
    pub step: WizardStep,
    pub step_number: u8,
    pub insurance_type: Option<InsuranceType>,
    pub fields: Vec<FieldView>,
    pub attachments: Vec<AttachmentSummary>,
    pub message: Option<String>,
    pub status_message: Option<String>,
    pub can_submit: bool,
    pub submitting: bool,
    pub celebrating: bool,
    pub last_submission: Option<SubmissionReport>,
    pub wallet: Option<crate::clients::WalletConnection>,
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celebration_window_saturates() {
        let now = Utc::now();
        let short = Celebration::starting_at("done", now, TimeDelta::seconds(5));
        assert!(short.is_active(now + TimeDelta::seconds(4)));
        assert!(!short.is_active(now + TimeDelta::seconds(5)));

        let endless = Celebration::starting_at("done", now, TimeDelta::MAX);
        assert_eq!(endless.until, DateTime::<Utc>::MAX_UTC);
        assert!(endless.is_active(now));
    }
}
