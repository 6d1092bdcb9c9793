//! The three systems the submission protocol writes to, plus the wallet that
//! signs ledger transactions. Each is a trait so the workflow receives them as
//! injected capabilities.

pub mod api;
pub mod ledger;
pub mod pinning;
mod rpc;
pub mod wallet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{ContentAddress, InsuranceType, TransactionOutcome};

pub use api::HttpApplicationsApi;
pub use ledger::{JsonRpcLedger, encode_store_document};
pub use pinning::PinataPinningService;
pub use wallet::JsonRpcWallet;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Body of `POST /applications`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSubmission {
    #[serde(rename = "type")]
    pub insurance_type: InsuranceType,
    #[serde(rename = "formData")]
    pub form_data: BTreeMap<String, String>,
    #[serde(rename = "recipientAddress")]
    pub recipient_address: String,
}

/// Arguments of the contract's `storeDocument(address,string,string)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDocumentCall {
    pub recipient: String,
    pub encrypted_link: String,
    pub encrypted_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WalletConnection {
    Connected { accounts: Vec<String> },
    Unavailable { reason: String },
}

impl WalletConnection {
    pub fn first_account(&self) -> Option<&str> {
        match self {
            WalletConnection::Connected { accounts } => accounts.first().map(String::as_str),
            WalletConnection::Unavailable { .. } => None,
        }
    }
}

#[async_trait]
pub trait ApplicationsApi: Send + Sync {
    /// Persist the draft; returns the API's acknowledgement message
    async fn save_application(&self, submission: &ApplicationSubmission)
    -> Result<String, ClientError>;
}

#[async_trait]
pub trait PinningService: Send + Sync {
    async fn pin_file(
        &self,
        file_name: &str,
        media_type: &str,
        content: &[u8],
    ) -> Result<ContentAddress, ClientError>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit the call from `from` and wait until it is mined or rejected
    async fn store_document(
        &self,
        from: &str,
        call: &StoreDocumentCall,
    ) -> Result<TransactionOutcome, ClientError>;
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Never fails: an unreachable or empty wallet is reported as `Unavailable`
    async fn connect(&self) -> WalletConnection;
}
