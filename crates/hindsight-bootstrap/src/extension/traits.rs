// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database connector trait definitions.
//!
//! Defines the abstract interface the extension enabler uses to talk to the
//! database, so the wire protocol can be swapped out or absent entirely.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatabaseError {
    /// The connection could not be established.
    #[error("Connection to {host} failed: {message}")]
    Connect {
        /// Host being connected to.
        host: String,
        /// Driver error description.
        message: String,
    },

    /// The connection attempt exceeded its timeout.
    #[error("Connection to {host} timed out after {timeout:?}")]
    Timeout {
        /// Host being connected to.
        host: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A statement failed.
    #[error("Statement failed ({code:?}): {message}")]
    Statement {
        /// SQLSTATE, when the server reported one.
        code: Option<String>,
        /// Server or driver message.
        message: String,
    },

    /// The extension name cannot be used as an identifier.
    #[error("Invalid extension name: {0}")]
    InvalidName(String),
}

impl DatabaseError {
    /// Whether the failure is operational (the database is not reachable or
    /// not accepting connections yet) and may clear up on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout { .. } => true,
            // class 08: connection exception; 57P03: cannot connect now
            Self::Statement {
                code: Some(code), ..
            } => code.starts_with("08") || code == "57P03",
            Self::Statement { code: None, .. } | Self::InvalidName(_) => false,
        }
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Where and as whom to connect.
#[derive(Clone)]
pub struct ConnectOptions {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Opens sessions against a database.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Open a session.
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn ExtensionSession>>;

    /// Connector name for logging.
    fn name(&self) -> &'static str;
}

/// An open session able to inspect and install extensions.
#[async_trait]
pub trait ExtensionSession: Send {
    /// Whether the extension is installed in the current database.
    async fn extension_exists(&mut self, name: &str) -> Result<bool>;

    /// Install the extension.
    async fn create_extension(&mut self, name: &str) -> Result<()>;

    /// Close the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Check that an extension name is a plain lowercase identifier.
pub fn validate_extension_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(code: Option<&str>) -> DatabaseError {
        DatabaseError::Statement {
            code: code.map(str::to_string),
            message: "failed".into(),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            DatabaseError::Connect {
                host: "db".into(),
                message: "refused".into()
            }
            .is_transient()
        );
        assert!(statement(Some("08006")).is_transient());
        assert!(statement(Some("57P03")).is_transient());
        assert!(!statement(Some("42501")).is_transient());
        assert!(!statement(None).is_transient());
        assert!(!DatabaseError::InvalidName("x".into()).is_transient());
    }

    #[test]
    fn test_extension_name_validation() {
        assert!(validate_extension_name("vector").is_ok());
        assert!(validate_extension_name("pg_trgm").is_ok());
        assert!(validate_extension_name("").is_err());
        assert!(validate_extension_name("vector; DROP TABLE x").is_err());
        assert!(validate_extension_name("Vector").is_err());
    }

    #[test]
    fn test_options_debug_hides_password() {
        let options = ConnectOptions {
            host: "db".into(),
            port: 5432,
            database: "hindsight".into(),
            username: "admin".into(),
            password: "abc123".into(),
            connect_timeout: Duration::from_secs(10),
        };
        assert!(!format!("{:?}", options).contains("abc123"));
    }
}
