use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ClientError, Ledger, StoreDocumentCall, rpc::RpcClient};
use crate::models::TransactionOutcome;

/// First four bytes of keccak256("storeDocument(address,string,string)")
const STORE_DOCUMENT_SELECTOR: [u8; 4] = [0x5b, 0x16, 0x74, 0xce];
pub const STORE_DOCUMENT_GAS: u64 = 2_000_000;
const WORD: usize = 32;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

/// Sends `storeDocument` transactions through a node's JSON-RPC endpoint and
/// waits for them to be mined. There is no upper bound on the wait.
pub struct JsonRpcLedger {
    rpc: RpcClient,
    contract_address: String,
    poll_interval: Duration,
}

impl JsonRpcLedger {
    pub fn new(
        client: reqwest::Client,
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            rpc: RpcClient::new(client, rpc_url),
            contract_address: contract_address.into(),
            poll_interval,
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionOutcome, ClientError> {
        loop {
            let receipt: Option<TransactionReceipt> = self
                .rpc
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            let Some(receipt) = receipt else {
                debug!(tx_hash = %tx_hash, "transaction pending");
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            let block_number = receipt
                .block_number
                .as_deref()
                .and_then(|n| u64::from_str_radix(n.trim_start_matches("0x"), 16).ok());

            return Ok(match receipt.status.as_deref() {
                Some("0x0") => {
                    warn!(tx_hash = %tx_hash, "transaction reverted");
                    TransactionOutcome::Rejected {
                        reason: format!("transaction {tx_hash} reverted"),
                    }
                }
                _ => TransactionOutcome::Mined {
                    tx_hash: tx_hash.to_string(),
                    block_number,
                },
            });
        }
    }
}

#[async_trait]
impl Ledger for JsonRpcLedger {
    async fn store_document(
        &self,
        from: &str,
        call: &StoreDocumentCall,
    ) -> Result<TransactionOutcome, ClientError> {
        let data = encode_store_document(call)?;
        let tx_hash: String = self
            .rpc
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": self.contract_address,
                    "gas": format!("0x{STORE_DOCUMENT_GAS:x}"),
                    "data": data,
                }]),
            )
            .await?;
        info!(tx_hash = %tx_hash, from = %from, "storeDocument transaction sent");

        self.wait_for_receipt(&tx_hash).await
    }
}

/// ABI-encode a `storeDocument` call as `0x`-prefixed calldata
pub fn encode_store_document(call: &StoreDocumentCall) -> Result<String, ClientError> {
    let link = encode_dynamic_string(&call.encrypted_link);
    let key = encode_dynamic_string(&call.encrypted_key);

    let head_len = 3 * WORD;
    let mut data = Vec::with_capacity(4 + head_len + link.len() + key.len());
    data.extend_from_slice(&STORE_DOCUMENT_SELECTOR);
    data.extend_from_slice(&encode_address(&call.recipient)?);
    data.extend_from_slice(&encode_uint(head_len));
    data.extend_from_slice(&encode_uint(head_len + link.len()));
    data.extend_from_slice(&link);
    data.extend_from_slice(&key);

    Ok(format!("0x{}", hex::encode(data)))
}

fn encode_uint(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn encode_address(address: &str) -> Result<[u8; WORD], ClientError> {
    let raw = hex::decode(address.trim_start_matches("0x"))
        .map_err(|e| ClientError::InvalidArgument(format!("address {address}: {e}")))?;
    if raw.len() != 20 {
        return Err(ClientError::InvalidArgument(format!(
            "address {address} is {} bytes, expected 20",
            raw.len()
        )));
    }
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&raw);
    Ok(word)
}

/// Length word followed by the bytes, right-padded to a whole word
fn encode_dynamic_string(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&encode_uint(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len, 0);
    out
}
