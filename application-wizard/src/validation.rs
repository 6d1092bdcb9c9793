//! Pure checks over the draft. Nothing here performs I/O or mutates state.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{ApplicationDraft, FieldKind, FieldSpec, InsuranceType};

pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_MEDIA_TYPES: [&str; 4] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentRejection {
    #[error("Invalid file type. Only PDF, PNG, JPG, and Word documents are allowed.")]
    UnsupportedType { media_type: String },
    #[error("File size exceeds 10MB limit.")]
    TooLarge { size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Unknown field '{field}' for {insurance_type} insurance")]
    UnknownField {
        field: String,
        insurance_type: InsuranceType,
    },
    #[error("'{field}' must be a date (MM/DD/YYYY)")]
    InvalidDate { field: &'static str },
}

/// Type is checked before size, so an oversized `.txt` reports the type.
pub fn check_attachment(media_type: &str, size: usize) -> Result<(), AttachmentRejection> {
    if !ALLOWED_MEDIA_TYPES.contains(&media_type) {
        return Err(AttachmentRejection::UnsupportedType {
            media_type: media_type.to_string(),
        });
    }
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentRejection::TooLarge { size });
    }
    Ok(())
}

pub fn is_filled(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Names of required fields that are still empty, in field-set order
pub fn missing_fields(
    insurance_type: InsuranceType,
    values: &BTreeMap<String, String>,
) -> Vec<&'static str> {
    insurance_type
        .field_set()
        .iter()
        .filter(|field| !is_filled(values.get(field.name)))
        .map(|field| field.name)
        .collect()
}

pub fn is_field_set_complete(draft: &ApplicationDraft) -> bool {
    match draft.selection {
        Some(insurance_type) => missing_fields(insurance_type, &draft.values).is_empty(),
        None => false,
    }
}

/// The draft may enter submission: type chosen, fields complete, at least
/// one attachment.
pub fn is_ready_for_submission(draft: &ApplicationDraft) -> bool {
    is_field_set_complete(draft) && !draft.attachments.is_empty()
}

/// Check a batch of field updates against the selection's field set.
///
/// Either every entry is acceptable or nothing should be applied.
pub fn check_field_updates(
    insurance_type: InsuranceType,
    updates: &BTreeMap<String, String>,
) -> Result<(), FieldError> {
    for (name, value) in updates {
        let field = insurance_type
            .field(name)
            .ok_or_else(|| FieldError::UnknownField {
                field: name.clone(),
                insurance_type,
            })?;
        check_field_value(field, value)?;
    }
    Ok(())
}

fn check_field_value(field: &'static FieldSpec, value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    // Clearing a field is always allowed; completeness is checked on advance.
    if value.is_empty() || field.kind == FieldKind::Text {
        return Ok(());
    }
    let parses = DATE_FORMATS
        .iter()
        .any(|format| NaiveDate::parse_from_str(value, format).is_ok());
    if parses {
        Ok(())
    } else {
        Err(FieldError::InvalidDate { field: field.name })
    }
}
