use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use super::{Wallet, WalletConnection, rpc::RpcClient};

/// Wallet backed by the accounts a JSON-RPC node manages
pub struct JsonRpcWallet {
    rpc: RpcClient,
}

impl JsonRpcWallet {
    pub fn new(client: reqwest::Client, rpc_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new(client, rpc_url),
        }
    }
}

#[async_trait]
impl Wallet for JsonRpcWallet {
    async fn connect(&self) -> WalletConnection {
        match self.rpc.call::<Vec<String>>("eth_accounts", json!([])).await {
            Ok(accounts) if !accounts.is_empty() => {
                info!(accounts = accounts.len(), "wallet connected");
                WalletConnection::Connected { accounts }
            }
            Ok(_) => {
                warn!("wallet reachable but exposes no accounts");
                WalletConnection::Unavailable {
                    reason: "wallet has no accounts".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "wallet unavailable");
                WalletConnection::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
