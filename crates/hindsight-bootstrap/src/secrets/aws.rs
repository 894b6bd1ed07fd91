// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secrets Manager backed store.

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{ProvideErrorMetadata, SdkError};
use tracing::debug;

use super::traits::*;

/// Error codes that indicate a retry may succeed.
const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "InternalServiceError",
    "ServiceUnavailable",
    "RequestTimeout",
];

/// Secret store backed by AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential and region chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

fn classify<E, R>(secret_id: &str, err: SdkError<E, R>) -> SecretError
where
    E: ProvideErrorMetadata,
    SdkError<E, R>: std::fmt::Display,
{
    let transient = match &err {
        SdkError::TimeoutError(_)
        | SdkError::DispatchFailure(_)
        | SdkError::ResponseError(_) => true,
        SdkError::ServiceError(service) => {
            let code = service.err().code();
            if code == Some("ResourceNotFoundException") {
                return SecretError::NotFound(secret_id.to_string());
            }
            code.is_some_and(|c| TRANSIENT_CODES.contains(&c))
        }
        _ => false,
    };

    SecretError::Backend {
        secret_id: secret_id.to_string(),
        message: err.to_string(),
        transient,
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String> {
        debug!(secret_id, "Reading secret");
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| classify(secret_id, e))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| SecretError::Malformed {
                secret_id: secret_id.to_string(),
                reason: "secret has no string value".to_string(),
            })
    }

    async fn put_secret_value(&self, secret_id: &str, value: &str) -> Result<()> {
        debug!(secret_id, "Writing secret");
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(value)
            .send()
            .await
            .map_err(|e| classify(secret_id, e))?;
        Ok(())
    }
}
