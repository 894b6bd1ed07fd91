// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory secret store for testing.
//!
//! Holds seeded values, records every write, and can be told to fail a
//! number of reads with a transient backend error.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

use super::traits::*;

/// In-memory secret store.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    /// Remaining transient read failures per secret.
    read_failures: Mutex<HashMap<String, u32>>,
    reads: AtomicU32,
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret.
    pub fn with_secret(mut self, secret_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.get_mut().insert(secret_id.into(), value.into());
        self
    }

    /// Fail the next `times` reads of `secret_id` with a transient error.
    pub fn failing_reads(mut self, secret_id: impl Into<String>, times: u32) -> Self {
        self.read_failures.get_mut().insert(secret_id.into(), times);
        self
    }

    /// Current value of a secret.
    pub async fn value(&self, secret_id: &str) -> Option<String> {
        self.values.lock().await.get(secret_id).cloned()
    }

    /// Every write, in order.
    pub async fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().await.clone()
    }

    /// Number of read attempts, including failed ones.
    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(remaining) = self.read_failures.lock().await.get_mut(secret_id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(SecretError::Backend {
                secret_id: secret_id.to_string(),
                message: "simulated throttling".to_string(),
                transient: true,
            });
        }

        self.values
            .lock()
            .await
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.to_string()))
    }

    async fn put_secret_value(&self, secret_id: &str, value: &str) -> Result<()> {
        self.writes
            .lock()
            .await
            .push((secret_id.to_string(), value.to_string()));
        self.values
            .lock()
            .await
            .insert(secret_id.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write() {
        let store = InMemorySecretStore::new().with_secret("a", "1");

        assert_eq!(store.get_secret_value("a").await.unwrap(), "1");
        store.put_secret_value("a", "2").await.unwrap();

        assert_eq!(store.value("a").await.as_deref(), Some("2"));
        assert_eq!(store.writes().await, vec![("a".to_string(), "2".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let store = InMemorySecretStore::new();
        assert!(matches!(
            store.get_secret_value("missing").await,
            Err(SecretError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemorySecretStore::new()
            .with_secret("a", "1")
            .failing_reads("a", 2);

        assert!(store.get_secret_value("a").await.unwrap_err().is_transient());
        assert!(store.get_secret_value("a").await.is_err());
        assert_eq!(store.get_secret_value("a").await.unwrap(), "1");
        assert_eq!(store.read_count(), 3);
    }
}
