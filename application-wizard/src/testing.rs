//! Recording fakes for the external collaborators.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::clients::{
    ApplicationSubmission, ApplicationsApi, ClientError, Ledger, PinningService,
    StoreDocumentCall, Wallet, WalletConnection,
};
use crate::models::{ContentAddress, DocumentAttachment, TransactionOutcome};

pub fn pdf(name: &str, size: usize) -> DocumentAttachment {
    DocumentAttachment {
        file_name: name.to_string(),
        media_type: "application/pdf".to_string(),
        content: vec![b'%'; size],
    }
}

pub fn connected_wallet() -> WalletConnection {
    WalletConnection::Connected {
        accounts: vec!["0xapplicant".to_string()],
    }
}

pub struct FakeApi {
    failure: Option<(u16, String)>,
    saved: Mutex<Vec<ApplicationSubmission>>,
}

impl FakeApi {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            failure: None,
            saved: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some((status, message.to_string())),
            saved: Mutex::new(Vec::new()),
        })
    }

    pub fn saved(&self) -> Vec<ApplicationSubmission> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApplicationsApi for FakeApi {
    async fn save_application(
        &self,
        submission: &ApplicationSubmission,
    ) -> Result<String, ClientError> {
        if let Some((status, message)) = &self.failure {
            return Err(ClientError::Rejected {
                status: *status,
                message: message.clone(),
            });
        }
        self.saved.lock().unwrap().push(submission.clone());
        Ok("Application saved successfully!".to_string())
    }
}

pub struct FakePinning {
    fail_on: Option<String>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    pinned: Mutex<Vec<String>>,
}

impl FakePinning {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_on: None,
            gate: None,
            pinned: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(file_name: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(file_name.to_string()),
            gate: None,
            pinned: Mutex::new(Vec::new()),
        })
    }

    /// Signals `entered` on each call, then waits for `release`
    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            fail_on: None,
            gate: Some((entered, release)),
            pinned: Mutex::new(Vec::new()),
        })
    }

    pub fn pinned_names(&self) -> Vec<String> {
        self.pinned.lock().unwrap().clone()
    }
}

#[async_trait]
impl PinningService for FakePinning {
    async fn pin_file(
        &self,
        file_name: &str,
        _media_type: &str,
        content: &[u8],
    ) -> Result<ContentAddress, ClientError> {
        self.pinned.lock().unwrap().push(file_name.to_string());
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_on.as_deref() == Some(file_name) {
            return Err(ClientError::Rejected {
                status: 502,
                message: "pinning unavailable".to_string(),
            });
        }
        Ok(ContentAddress(format!("Qm{file_name}{}", content.len())))
    }
}

pub struct FakeLedger {
    reject_first: bool,
    calls: Mutex<Vec<(String, StoreDocumentCall)>>,
}

impl FakeLedger {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            reject_first: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting_first() -> Arc<Self> {
        Arc::new(Self {
            reject_first: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, StoreDocumentCall)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn store_document(
        &self,
        from: &str,
        call: &StoreDocumentCall,
    ) -> Result<TransactionOutcome, ClientError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((from.to_string(), call.clone()));
            calls.len()
        };
        if self.reject_first && count == 1 {
            return Err(ClientError::Rpc {
                code: 4001,
                message: "User denied transaction signature".to_string(),
            });
        }
        Ok(TransactionOutcome::Mined {
            tx_hash: format!("0xtx{count}"),
            block_number: Some(count as u64),
        })
    }
}

pub struct FakeWallet(pub WalletConnection);

#[async_trait]
impl Wallet for FakeWallet {
    async fn connect(&self) -> WalletConnection {
        self.0.clone()
    }
}
