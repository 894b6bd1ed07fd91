// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! LLM API key populator.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::error::Result;
use crate::event::{ProvisioningEvent, ProvisioningResponse};
use crate::secrets::SecretStore;

/// Physical id reported for a delete without a prior id.
pub const DEFAULT_RESOURCE_ID: &str = "llm-key-resource";

/// Required key prefix (also covers `sk-proj-`).
pub const KEY_PREFIX: &str = "sk-";

/// Rejected API key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// No key was supplied.
    #[error("LLM API key is required; pass it with --llm-api-key or HINDSIGHT_LLM_API_KEY")]
    Missing,

    /// The key does not look like a provider key.
    #[error("LLM API key must start with 'sk-' or 'sk-proj-'")]
    BadPrefix,
}

/// Check the shape of an API key. Length is not checked.
pub fn validate_api_key(key: &str) -> std::result::Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::Missing);
    }
    if !key.starts_with(KEY_PREFIX) {
        return Err(ValidationError::BadPrefix);
    }
    Ok(())
}

/// Input properties of the key step.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LlmKeyProperties {
    /// Secret to write the key into.
    pub llm_secret_arn: String,
    /// The key itself.
    #[serde(default)]
    pub llm_api_key: String,
}

impl std::fmt::Debug for LlmKeyProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmKeyProperties")
            .field("llm_secret_arn", &self.llm_secret_arn)
            .field("llm_api_key", &"<redacted>")
            .finish()
    }
}

/// Bootstrap function that writes the operator's API key.
pub struct LlmKeyPopulator {
    secrets: Arc<dyn SecretStore>,
}

impl LlmKeyPopulator {
    /// Create a populator.
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    /// Handle one provisioning event.
    pub async fn handle(&self, event: &ProvisioningEvent) -> Result<ProvisioningResponse> {
        if event.is_delete() {
            return Ok(ProvisioningResponse::success(
                event.physical_resource_id_or(DEFAULT_RESOURCE_ID),
            ));
        }

        let props: LlmKeyProperties = event.properties()?;
        validate_api_key(&props.llm_api_key)?;

        self.secrets
            .put_secret_value(&props.llm_secret_arn, &props.llm_api_key)
            .await?;

        info!(secret_id = %props.llm_secret_arn, "LLM API key secret populated");

        Ok(ProvisioningResponse::success(props.llm_secret_arn)
            .with_data("Message", "LLM API key secret populated successfully"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("sk-abcdef"), Ok(()));
        assert_eq!(validate_api_key("sk-proj-abcdef"), Ok(()));
        assert_eq!(validate_api_key("sk-"), Ok(()));
        assert_eq!(validate_api_key(""), Err(ValidationError::Missing));
        assert_eq!(validate_api_key("xk-123"), Err(ValidationError::BadPrefix));
        assert_eq!(validate_api_key("SK-123"), Err(ValidationError::BadPrefix));
    }

    #[test]
    fn test_properties_debug_hides_key() {
        let props = LlmKeyProperties {
            llm_secret_arn: "arn".into(),
            llm_api_key: "sk-secret".into(),
        };
        assert!(!format!("{:?}", props).contains("sk-secret"));
    }
}
