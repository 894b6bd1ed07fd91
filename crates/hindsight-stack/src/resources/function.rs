// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bootstrap functions and the provisioning steps that invoke them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::ResourceId;

/// Which bootstrap function a declaration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Writes the database connection URL secret.
    DbUrlPopulator,
    /// Ensures the vector extension exists in the database.
    ExtensionEnabler,
    /// Validates and stores the operator's LLM API key.
    LlmKeyPopulator,
    /// Calls the memory service's reflect endpoint on a timer.
    ReflectJob,
}

impl FunctionKind {
    /// Execution window granted to the function.
    pub fn timeout(&self) -> Duration {
        match self {
            // 5 attempts x 5s plus secret calls
            FunctionKind::DbUrlPopulator => Duration::from_secs(60),
            // 10 attempts x 10s plus connection time
            FunctionKind::ExtensionEnabler => Duration::from_secs(300),
            FunctionKind::LlmKeyPopulator => Duration::from_secs(30),
            // downstream batch summarization can be slow
            FunctionKind::ReflectJob => Duration::from_secs(300),
        }
    }

    /// Subcommand of `hindsight-ctl` that implements the function.
    pub fn command(&self) -> &'static str {
        match self {
            FunctionKind::DbUrlPopulator => "db-url",
            FunctionKind::ExtensionEnabler => "enable-extension",
            FunctionKind::LlmKeyPopulator => "llm-key",
            FunctionKind::ReflectJob => "reflect",
        }
    }
}

/// Access granted on a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantAccess {
    /// Read the current value.
    Read,
    /// Overwrite the value.
    Write,
}

/// A secret permission held by a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretGrant {
    /// Secret the grant applies to.
    pub secret: ResourceId,
    /// Kind of access.
    pub access: GrantAccess,
}

/// Declaration of a bootstrap function.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapFunction {
    /// Resource identifier.
    pub id: ResourceId,
    /// What the function does.
    pub kind: FunctionKind,
    /// Command the function runs.
    pub command: Vec<String>,
    /// Execution window.
    #[serde(serialize_with = "serialize_secs")]
    pub timeout: Duration,
    /// Memory (MiB).
    pub memory_mib: u32,
    /// Whether it runs inside the private subnets (needed to reach the database).
    pub in_private_network: bool,
    /// Environment passed to the function.
    pub environment: BTreeMap<String, PropertyValue>,
    /// Secret permissions.
    pub grants: Vec<SecretGrant>,
}

impl BootstrapFunction {
    /// Declare a function of `kind` with its default timeout and 256 MiB.
    pub fn new(id: impl Into<ResourceId>, kind: FunctionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            command: vec!["hindsight-ctl".to_string(), kind.command().to_string()],
            timeout: kind.timeout(),
            memory_mib: 256,
            in_private_network: false,
            environment: BTreeMap::new(),
            grants: Vec::new(),
        }
    }

    /// Run inside the private subnets.
    pub fn in_private_network(mut self) -> Self {
        self.in_private_network = true;
        self
    }

    /// Grant access on a secret.
    pub fn grant(mut self, secret: &ResourceId, access: GrantAccess) -> Self {
        self.grants.push(SecretGrant {
            secret: secret.clone(),
            access,
        });
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.environment.insert(key.into(), value);
        self
    }

    /// Whether the function may perform `access` on `secret`.
    pub fn can(&self, secret: &ResourceId, access: GrantAccess) -> bool {
        self.grants
            .iter()
            .any(|grant| &grant.secret == secret && grant.access == access)
    }
}

/// A value passed to a function, resolved by the provisioning system.
#[derive(Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A literal string.
    Literal(String),
    /// An attribute of another resource, known only at deploy time.
    Reference {
        /// Resource the attribute belongs to.
        resource: ResourceId,
        /// Attribute name (e.g. `endpoint`, `arn`, `url`).
        attribute: String,
    },
    /// A sensitive deploy-time parameter. Rendered as a `${param.<name>}`
    /// placeholder the provisioning system binds; the value never is.
    Sensitive {
        /// Parameter name.
        parameter: String,
        /// Supplied value; empty when the operator supplied none.
        value: String,
    },
}

const REDACTED: &str = "<redacted>";

impl PropertyValue {
    /// Literal value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Sensitive parameter `parameter` carrying `value`.
    pub fn sensitive(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Sensitive {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Reference to `resource.attribute`.
    pub fn reference(resource: &ResourceId, attribute: &str) -> Self {
        Self::Reference {
            resource: resource.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// Resource this value depends on, if any.
    pub fn referenced_resource(&self) -> Option<&ResourceId> {
        match self {
            Self::Reference { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Reference {
                resource,
                attribute,
            } => write!(f, "${{{}.{}}}", resource, attribute),
            Self::Sensitive { parameter, .. } => write!(f, "${{param.{}}}", parameter),
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensitive { parameter, .. } => f
                .debug_struct("Sensitive")
                .field("parameter", parameter)
                .field("value", &REDACTED)
                .finish(),
            other => write!(f, "{:?}", other.to_string()),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A one-shot invocation of a bootstrap function during provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningStep {
    /// Resource identifier.
    pub id: ResourceId,
    /// Function invoked.
    pub function: ResourceId,
    /// Properties delivered in the provisioning event.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ProvisioningStep {
    /// Declare a step invoking `function`.
    pub fn new(id: impl Into<ResourceId>, function: &ResourceId) -> Self {
        Self {
            id: id.into(),
            function: function.clone(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Resources referenced by the step's properties.
    pub fn referenced_resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.properties
            .values()
            .filter_map(PropertyValue::referenced_resource)
    }
}

pub(crate) fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_values_render_as_parameters() {
        let value = PropertyValue::sensitive("LlmApiKey", "sk-secret");
        assert_eq!(value.to_string(), "${param.LlmApiKey}");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            "\"${param.LlmApiKey}\""
        );

        let debug = format!("{:?}", value);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(value.referenced_resource(), None);
    }

    #[test]
    fn test_reference_rendering() {
        let db = ResourceId::new("RdsInstance");
        let value = PropertyValue::reference(&db, "endpoint");
        assert_eq!(value.to_string(), "${RdsInstance.endpoint}");
        assert_eq!(value.referenced_resource(), Some(&db));
    }

    #[test]
    fn test_function_defaults() {
        let function = BootstrapFunction::new("PgvectorEnabler", FunctionKind::ExtensionEnabler);
        assert_eq!(function.timeout, Duration::from_secs(300));
        assert_eq!(function.memory_mib, 256);
        assert_eq!(function.command, vec!["hindsight-ctl", "enable-extension"]);
    }
}
