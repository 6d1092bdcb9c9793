use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ApplicationSubmission, ApplicationsApi, ClientError};

const SAVE_FALLBACK_MESSAGE: &str = "Failed to save the application";

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
    error: Option<String>,
}

/// Client for the portal's applications endpoint
pub struct HttpApplicationsApi {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpApplicationsApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }
}

#[async_trait]
impl ApplicationsApi for HttpApplicationsApi {
    async fn save_application(
        &self,
        submission: &ApplicationSubmission,
    ) -> Result<String, ClientError> {
        let url = format!("{}/applications", self.base_url);
        debug!(url = %url, insurance_type = %submission.insurance_type, "saving application");

        let mut request = self.client.post(&url).json(submission);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        // A body that is not the expected JSON still leaves the status to go on.
        let body = response.json::<MessageBody>().await.ok();

        if status.is_success() {
            return Ok(body
                .and_then(|b| b.message)
                .unwrap_or_else(|| "Application saved".to_string()));
        }

        let message = body
            .and_then(|b| b.error)
            .unwrap_or_else(|| SAVE_FALLBACK_MESSAGE.to_string());
        warn!(status = status.as_u16(), error = %message, "applications API rejected draft");
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
