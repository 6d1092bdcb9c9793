use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub insurance_type: String,
    #[serde(rename = "formData")]
    pub form_data: Map<String, Value>,
    #[serde(rename = "recipientAddress", skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
    pub status: ApplicationStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "policyType")]
    pub policy_type: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

/// A validation failure, reported to the caller as `400 {error}`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

const APPLICATION_KEYS: [&str; 4] = ["type", "selectedType", "formData", "recipientAddress"];

/// Validate a `POST /applications` body into a new pending record.
///
/// `selectedType` is accepted in place of `type`; any other unknown key is
/// rejected.
pub fn parse_application(body: &Value) -> Result<ApplicationRecord, ValidationError> {
    let object = body
        .as_object()
        .ok_or_else(|| joi("value", "must be of type object"))?;

    let insurance_type = match object.get("type").or_else(|| object.get("selectedType")) {
        None | Some(Value::Null) => return Err(joi("type", "is required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(joi("type", "is not allowed to be empty"));
        }
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(joi("type", "must be a string")),
    };

    let form_data = match object.get("formData") {
        None | Some(Value::Null) => return Err(joi("formData", "is required")),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(joi("formData", "must be of type object")),
    };

    let recipient_address = match object.get("recipientAddress") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(joi("recipientAddress", "must be a string")),
    };

    if let Some(key) = object
        .keys()
        .find(|key| !APPLICATION_KEYS.contains(&key.as_str()))
    {
        return Err(joi(key, "is not allowed"));
    }

    Ok(ApplicationRecord {
        id: Uuid::new_v4(),
        insurance_type,
        form_data,
        recipient_address,
        status: ApplicationStatus::Pending,
        created_at: Utc::now(),
    })
}

fn joi(key: &str, problem: &str) -> ValidationError {
    ValidationError(format!("\"{key}\" {problem}"))
}

#[derive(Debug, Deserialize)]
pub struct NewClaim {
    #[serde(rename = "policyType")]
    pub policy_type: Option<String>,
    pub description: Option<String>,
}

impl NewClaim {
    pub fn into_record(self) -> Result<ClaimRecord, ValidationError> {
        let filled = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (filled(self.policy_type), filled(self.description)) {
            (Some(policy_type), Some(description)) => Ok(ClaimRecord {
                id: Uuid::new_v4(),
                policy_type,
                description,
                date: Utc::now(),
            }),
            _ => Err(ValidationError(
                "Policy type and description are required.".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

impl StatusUpdate {
    /// Only a final decision can be set; `pending` is the initial state.
    pub fn decision(&self) -> Result<ApplicationStatus, ValidationError> {
        match self.status.as_str() {
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(ValidationError(
                "Status must be 'approved' or 'rejected'.".to_string(),
            )),
        }
    }
}

/// Raw `page`/`limit` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub const MAX_PAGE_LIMIT: u64 = 100;

/// Validated paging. `offset()` always fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl TryFrom<PageQuery> for Page {
    type Error = ValidationError;

    fn try_from(query: PageQuery) -> Result<Self, Self::Error> {
        let positive = |raw: Option<String>, default: u64| match raw {
            None => Some(default),
            Some(raw) => raw.parse::<u64>().ok().filter(|n| *n >= 1),
        };
        let (Some(page), Some(limit)) = (positive(query.page, 1), positive(query.limit, 10)) else {
            return Err(ValidationError(
                "page and limit must be positive integers".to_string(),
            ));
        };
        if limit > MAX_PAGE_LIMIT {
            return Err(ValidationError(format!(
                "limit must not exceed {MAX_PAGE_LIMIT}"
            )));
        }
        // The offset is handed to SQL as a signed 64-bit integer.
        let offset_fits = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !offset_fits {
            return Err(ValidationError(
                "page and limit must be positive integers".to_string(),
            ));
        }
        Ok(Page { page, limit })
    }
}
