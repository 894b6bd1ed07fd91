// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock connector for testing.
//!
//! Simulates a database with a set of installed extensions, records every
//! connection attempt and statement, and can fail a number of connection
//! attempts before accepting.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

use super::traits::*;

#[derive(Debug, Default)]
struct MockState {
    installed: HashSet<String>,
    statements: Vec<String>,
    closed_sessions: u32,
}

/// Mock database connector.
#[derive(Debug, Default, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    attempts: Arc<AtomicU32>,
    /// Remaining connection attempts to fail with a transient error.
    failing_connects: Arc<AtomicU32>,
    /// If set, creating an extension fails with this SQLSTATE.
    pub create_error_code: Option<String>,
}

impl MockConnector {
    /// Create a connector for an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Database that already has `name` installed.
    pub fn with_extension(self, name: &str) -> Self {
        if let Ok(mut state) = self.state.try_lock() {
            state.installed.insert(name.to_string());
        }
        self
    }

    /// Refuse the first `times` connection attempts.
    pub fn failing_connects(self, times: u32) -> Self {
        self.failing_connects.store(times, Ordering::SeqCst);
        self
    }

    /// Number of connection attempts, including refused ones.
    pub fn connection_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Statements executed, in order.
    pub async fn statements(&self) -> Vec<String> {
        self.state.lock().await.statements.clone()
    }

    /// Statements that changed the database.
    pub async fn mutating_statements(&self) -> Vec<String> {
        self.statements()
            .await
            .into_iter()
            .filter(|s| !s.starts_with("SELECT"))
            .collect()
    }

    /// Whether an extension is installed.
    pub async fn is_installed(&self, name: &str) -> bool {
        self.state.lock().await.installed.contains(name)
    }

    /// Number of sessions closed.
    pub async fn closed_sessions(&self) -> u32 {
        self.state.lock().await.closed_sessions
    }
}

#[async_trait]
impl DatabaseConnector for MockConnector {
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn ExtensionSession>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(DatabaseError::Connect {
                host: options.host.clone(),
                message: "connection refused".to_string(),
            });
        }

        Ok(Box::new(MockSession {
            state: self.state.clone(),
            create_error_code: self.create_error_code.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
    create_error_code: Option<String>,
}

#[async_trait]
impl ExtensionSession for MockSession {
    async fn extension_exists(&mut self, name: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.statements.push(format!(
            "SELECT 1 FROM pg_extension WHERE extname = '{}'",
            name
        ));
        Ok(state.installed.contains(name))
    }

    async fn create_extension(&mut self, name: &str) -> Result<()> {
        validate_extension_name(name)?;
        let mut state = self.state.lock().await;
        state
            .statements
            .push(format!("CREATE EXTENSION IF NOT EXISTS {}", name));

        if let Some(code) = &self.create_error_code {
            return Err(DatabaseError::Statement {
                code: Some(code.clone()),
                message: "simulated failure".to_string(),
            });
        }
        state.installed.insert(name.to_string());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().await.closed_sessions += 1;
        Ok(())
    }
}
