// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vector extension enabler.
//!
//! Installs the vector extension in the application database after the
//! instance becomes reachable. When no database connector is available the
//! step still succeeds and tells the operator how to finish by hand.

mod mock;
#[cfg(feature = "postgres")]
mod postgres;
mod traits;

pub use mock::MockConnector;
#[cfg(feature = "postgres")]
pub use postgres::PgConnector;
pub use traits::*;

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result as BootstrapResult;
use crate::event::{ProvisioningEvent, ProvisioningResponse};
use crate::retry::RetryPolicy;
use crate::secrets::{DatabaseCredentials, SecretStore};

/// Physical id reported when the extension must be enabled manually.
pub const MANUAL_SETUP_ID: &str = "pgvector-manual-setup-required";

/// Physical id reported for a delete without a prior id.
pub const DEFAULT_RESOURCE_ID: &str = "pgvector-resource";

/// Extension installed when the event does not name one.
pub const DEFAULT_EXTENSION: &str = "vector";

/// Connection establishment timeout per attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_port() -> u16 {
    5432
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

/// Input properties of the extension step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionProperties {
    /// Database host.
    pub rds_endpoint: String,
    /// Secret holding the master credentials.
    pub rds_secret_arn: String,
    /// Database name.
    pub db_name: String,
    /// Master username.
    pub db_username: String,
    /// Database port.
    #[serde(default = "default_port", deserialize_with = "crate::db_url::port_from_any")]
    pub db_port: u16,
    /// Extension to install.
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Bootstrap function that installs the vector extension.
pub struct ExtensionEnabler {
    secrets: Arc<dyn SecretStore>,
    connector: Option<Arc<dyn DatabaseConnector>>,
    retry: RetryPolicy,
}

impl ExtensionEnabler {
    /// Create an enabler. `connector` is `None` when no wire protocol
    /// implementation is available.
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        connector: Option<Arc<dyn DatabaseConnector>>,
    ) -> Self {
        Self {
            secrets,
            connector,
            retry: RetryPolicy::EXTENSION,
        }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handle one provisioning event.
    pub async fn handle(
        &self,
        event: &ProvisioningEvent,
    ) -> BootstrapResult<ProvisioningResponse> {
        if event.is_delete() {
            // the extension is left installed
            return Ok(ProvisioningResponse::success(
                event.physical_resource_id_or(DEFAULT_RESOURCE_ID),
            ));
        }

        let Some(connector) = &self.connector else {
            warn!(
                "No database connector available; the vector extension must be enabled manually"
            );
            return Ok(manual_setup_response());
        };

        let props: ExtensionProperties = event.properties()?;
        validate_extension_name(&props.extension)?;

        let secret = self.secrets.get_secret_value(&props.rds_secret_arn).await?;
        let credentials = DatabaseCredentials::from_secret_string(&props.rds_secret_arn, &secret)?;

        let options = ConnectOptions {
            host: props.rds_endpoint.clone(),
            port: props.db_port,
            database: props.db_name.clone(),
            username: props.db_username.clone(),
            password: credentials.password,
            connect_timeout: CONNECT_TIMEOUT,
        };

        let connector = connector.as_ref();
        let options = &options;
        let extension = props.extension.as_str();

        let created = self
            .retry
            .run(
                "enable_extension",
                move |attempt| {
                    async move {
                        info!(
                            host = %options.host,
                            database = %options.database,
                            connector = connector.name(),
                            attempt,
                            "Connecting to database"
                        );
                        ensure_extension(connector, options, extension).await
                    }
                },
                DatabaseError::is_transient,
            )
            .await?;

        if created {
            info!(extension = %props.extension, "Extension created");
        } else {
            info!(extension = %props.extension, "Extension already exists");
        }

        Ok(
            ProvisioningResponse::success(format!("{}/{}", props.rds_endpoint, props.db_name))
                .with_data("Message", "pgvector extension enabled successfully"),
        )
    }
}

/// Install `extension` unless present. Returns whether it was created.
async fn ensure_extension(
    connector: &dyn DatabaseConnector,
    options: &ConnectOptions,
    extension: &str,
) -> Result<bool> {
    let mut session = connector.connect(options).await?;

    let created = if session.extension_exists(extension).await? {
        false
    } else {
        session.create_extension(extension).await?;
        true
    };

    session.close().await?;
    Ok(created)
}

fn manual_setup_response() -> ProvisioningResponse {
    ProvisioningResponse::success(MANUAL_SETUP_ID)
        .with_data(
            "Message",
            "No database driver available. pgvector extension must be enabled manually.",
        )
        .with_data(
            "Instructions",
            "Connect to RDS and run: CREATE EXTENSION IF NOT EXISTS vector;",
        )
        .with_data(
            "Note",
            "The stack will complete successfully, but pgvector must be enabled manually after deployment.",
        )
}
