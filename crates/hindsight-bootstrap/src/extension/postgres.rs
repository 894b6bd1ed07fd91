// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL connector backed by sqlx.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions as _, Connection};
use tracing::debug;

use super::traits::*;

/// Connector speaking the PostgreSQL wire protocol.
#[derive(Debug, Default, Clone)]
pub struct PgConnector;

impl PgConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

fn statement_error(err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) => DatabaseError::Statement {
            code: db.code().map(|c| c.into_owned()),
            message: db.message().to_string(),
        },
        _ => DatabaseError::Statement {
            code: None,
            message: err.to_string(),
        },
    }
}

/// Anything that fails before the server reports a SQLSTATE is a
/// connection-level failure, including protocol errors from a server that is
/// still starting.
fn connect_error(host: &str, err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::Database(_) => statement_error(err),
        other => DatabaseError::Connect {
            host: host.to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl DatabaseConnector for PgConnector {
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn ExtensionSession>> {
        let connect_options = PgConnectOptions::new()
            .host(&options.host)
            .port(options.port)
            .database(&options.database)
            .username(&options.username)
            .password(&options.password);

        let conn = tokio::time::timeout(options.connect_timeout, connect_options.connect())
            .await
            .map_err(|_| DatabaseError::Timeout {
                host: options.host.clone(),
                timeout: options.connect_timeout,
            })?
            .map_err(|e| connect_error(&options.host, e))?;

        debug!(host = %options.host, database = %options.database, "Connected");
        Ok(Box::new(PgSession { conn }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl ExtensionSession for PgSession {
    async fn extension_exists(&mut self, name: &str) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_extension WHERE extname = $1")
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(statement_error)?;
        Ok(row.is_some())
    }

    async fn create_extension(&mut self, name: &str) -> Result<()> {
        // identifiers cannot be bound as parameters
        validate_extension_name(name)?;
        let sql = format!("CREATE EXTENSION IF NOT EXISTS {}", name);
        sqlx::query(&sql)
            .execute(&mut self.conn)
            .await
            .map_err(statement_error)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(statement_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::io::Read;
    use std::net::{Shutdown, TcpListener};
    use std::time::Duration;

    use sqlx::error::{DatabaseError as SqlxDatabaseError, ErrorKind};

    fn options(port: u16, connect_timeout: Duration) -> ConnectOptions {
        ConnectOptions {
            host: "127.0.0.1".into(),
            port,
            database: "hindsight".into(),
            username: "admin".into(),
            password: "abc123".into(),
            connect_timeout,
        }
    }

    async fn connect_err(options: &ConnectOptions) -> DatabaseError {
        match PgConnector::new().connect(options).await {
            Ok(_) => panic!("expected connection failure"),
            Err(e) => e,
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct ServerError {
        code: &'static str,
        message: &'static str,
    }

    impl SqlxDatabaseError for ServerError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn server_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ServerError {
            code,
            message: "server said no",
        }))
    }

    #[tokio::test]
    async fn test_refused_port_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect_err(&options(port, Duration::from_secs(5))).await;

        assert!(matches!(err, DatabaseError::Connect { .. }), "{:?}", err);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // accepted by the kernel backlog, never answered
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let err = connect_err(&options(port, Duration::from_millis(300))).await;
        drop(listener);

        assert!(matches!(err, DatabaseError::Timeout { .. }), "{:?}", err);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_dropped_handshake_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 8];
                let _ = stream.read(&mut buf);
                let _ = stream.shutdown(Shutdown::Both);
            }
        });

        let err = connect_err(&options(port, Duration::from_secs(5))).await;
        server.join().unwrap();

        assert!(matches!(err, DatabaseError::Connect { .. }), "{:?}", err);
        assert!(err.is_transient());
    }

    #[test]
    fn test_server_errors_keep_sqlstate() {
        let auth = connect_error("db", server_error("28P01"));
        assert!(matches!(
            &auth,
            DatabaseError::Statement { code: Some(code), .. } if code == "28P01"
        ));
        assert!(!auth.is_transient());

        assert!(!statement_error(server_error("42501")).is_transient());
        assert!(connect_error("db", server_error("57P03")).is_transient());
        assert!(statement_error(server_error("08006")).is_transient());
    }

    #[test]
    fn test_driver_errors_while_connecting_are_connection_failures() {
        let err = connect_error("db", sqlx::Error::Protocol("unexpected response".into()));
        assert!(matches!(err, DatabaseError::Connect { ref host, .. } if host == "db"));
        assert!(err.is_transient());
    }
}
