//! Reversible text encoding of a content address for the on-chain record.
//!
//! This is base64, not encryption: anyone reading the ledger can recover the
//! address and the shared key. The contract's parameter names still say
//! "encrypted" because they are part of its ABI.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::models::ContentAddress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedReference {
    pub link: String,
    pub key: String,
}

impl EncodedReference {
    pub fn from_content_address(address: &ContentAddress, shared_key: &str) -> Self {
        Self {
            link: STANDARD.encode(address.0.as_bytes()),
            key: STANDARD.encode(shared_key.as_bytes()),
        }
    }

    /// Recover the content address and shared key
    pub fn decode(&self) -> Result<(ContentAddress, String), DecodeError> {
        let link = decode_text(&self.link)?;
        let key = decode_text(&self.key)?;
        Ok((ContentAddress(link), key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn decode_text(encoded: &str) -> Result<String, DecodeError> {
    Ok(String::from_utf8(STANDARD.decode(encoded)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_btoa() {
        let address = ContentAddress("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".to_string());
        let encoded = EncodedReference::from_content_address(&address, "some-encryption-key");

        assert_eq!(encoded.key, "c29tZS1lbmNyeXB0aW9uLWtleQ==");
        let (link, key) = encoded.decode().unwrap();
        assert_eq!(link, address);
        assert_eq!(key, "some-encryption-key");
    }

    #[test]
    fn decode_rejects_garbage() {
        let encoded = EncodedReference {
            link: "not base64!".to_string(),
            key: String::new(),
        };
        assert!(matches!(encoded.decode(), Err(DecodeError::Base64(_))));
    }
}
