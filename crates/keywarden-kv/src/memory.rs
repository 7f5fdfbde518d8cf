//! In-memory keystore for tests and local development

use crate::{KvError, KvStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use zeroize::Zeroizing;

/// A keystore held entirely in process memory. Contents are lost on exit;
/// useful for tests and throwaway dev servers only.
#[derive(Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Zeroizing<Vec<u8>>, KvError> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|v| Zeroizing::new(v.clone()))
            .ok_or_else(|| KvError::not_found(key))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_of_missing_key_is_not_found() {
        let store = InMemoryKv::new();
        let err = store.get("vault-unseal-0").await.unwrap_err();
        assert!(matches!(err, KvError::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryKv::new();
        store.set("vault-unseal-0", b"share").await.unwrap();
        assert_eq!(
            store.get("vault-unseal-0").await.unwrap().as_slice(),
            b"share"
        );
    }
}
