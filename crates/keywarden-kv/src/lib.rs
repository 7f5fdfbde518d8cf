//! # keywarden-kv
//!
//! The keystore is the trust root of the lifecycle manager: unseal shares,
//! recovery shares, and the root token are persisted here and nowhere else.
//! The trait is deliberately small (get/set plus a round-trip probe) so that
//! cloud KMS-backed buckets, files, and in-memory stores are interchangeable.

pub mod file;
pub mod memory;

pub use file::FileKv;
pub use memory::InMemoryKv;

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

/// Keystore error. `NotFound` is a first-class signal callers branch on;
/// everything else is a failure.
#[derive(Error, Debug)]
pub enum KvError {
    #[error("key '{key}' not found in the keystore")]
    NotFound { key: String },

    #[error("key '{key}' already exists in the keystore")]
    AlreadyExists { key: String },

    #[error("keystore IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keystore error: {message}")]
    Other { message: String },
}

impl KvError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// An opaque key-value store for secret material.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`, or `KvError::NotFound`.
    async fn get(&self, key: &str) -> Result<Zeroizing<Vec<u8>>, KvError>;

    /// Store `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Round-trip probe validating access rights before anything secret is
    /// written.
    async fn test(&self, key: &str) -> Result<(), KvError> {
        const PROBE: &[u8] = b"keystore-probe";
        self.set(key, PROBE).await?;
        let read_back = self.get(key).await?;
        if read_back.as_slice() == PROBE {
            Ok(())
        } else {
            Err(KvError::other(format!(
                "probe value read back from key '{key}' does not match what was written"
            )))
        }
    }
}

/// Create-only write: only a missing key may be written. An existing value
/// fails with `AlreadyExists` so residual material from an earlier init can
/// never be silently overwritten.
pub async fn set_once(store: &dyn KvStore, key: &str, value: &[u8]) -> Result<(), KvError> {
    match store.get(key).await {
        Err(KvError::NotFound { .. }) => store.set(key, value).await,
        Ok(_) => Err(KvError::already_exists(key)),
        Err(e) => Err(e),
    }
}
