use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ClientError, PinningService};
use crate::models::ContentAddress;

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pins files through a Pinata-compatible `pinFileToIPFS` endpoint
pub struct PinataPinningService {
    client: reqwest::Client,
    url: String,
    api_key: String,
    secret_key: String,
}

impl PinataPinningService {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PinningService for PinataPinningService {
    async fn pin_file(
        &self,
        file_name: &str,
        media_type: &str,
        content: &[u8],
    ) -> Result<ContentAddress, ClientError> {
        debug!(file_name = %file_name, size = content.len(), "pinning file");

        let part = Part::bytes(content.to_vec())
            .file_name(file_name.to_string())
            .mime_str(media_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: format!("pinning service returned {status}: {message}"),
            });
        }

        let pinned: PinResponse = response.json().await?;
        info!(file_name = %file_name, content_address = %pinned.ipfs_hash, "file pinned");
        Ok(ContentAddress(pinned.ipfs_hash))
    }
}
