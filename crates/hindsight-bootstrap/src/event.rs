// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provisioning event envelope.
//!
//! The provisioning system invokes a bootstrap function with an envelope
//! carrying `RequestType`, `PhysicalResourceId` and `ResourceProperties`. A
//! bare properties object is also accepted and treated as a `Create`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors decoding a provisioning event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventError {
    /// The event is not valid JSON.
    #[error("Malformed event: {0}")]
    Json(#[from] serde_json::Error),

    /// The event is valid JSON but not an object.
    #[error("Event must be a JSON object")]
    NotAnObject,

    /// The resource properties do not match the function's input.
    #[error("Invalid resource properties: {0}")]
    InvalidProperties(#[source] serde_json::Error),
}

/// Lifecycle phase of a provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestType {
    /// Resource is being created.
    #[default]
    Create,
    /// Resource properties changed.
    Update,
    /// Resource is being removed.
    Delete,
}

/// One invocation of a bootstrap function.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningEvent {
    /// Lifecycle phase.
    pub request_type: RequestType,
    /// Physical id returned by a previous invocation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    /// Function input.
    pub resource_properties: Value,
}

impl ProvisioningEvent {
    /// A `Create` event with the given properties.
    pub fn create(properties: Value) -> Self {
        Self {
            request_type: RequestType::Create,
            physical_resource_id: None,
            resource_properties: properties,
        }
    }

    /// A `Delete` event for a previously returned physical id.
    pub fn delete(physical_resource_id: Option<String>, properties: Value) -> Self {
        Self {
            request_type: RequestType::Delete,
            physical_resource_id,
            resource_properties: properties,
        }
    }

    /// Decode an event from raw JSON text.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Decode an event from a JSON value, accepting a bare properties object.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let Value::Object(mut map) = value else {
            return Err(EventError::NotAnObject);
        };

        let request_type = match map.get("RequestType") {
            Some(value) => RequestType::deserialize(value)?,
            None => RequestType::Create,
        };
        let physical_resource_id = map
            .get("PhysicalResourceId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let resource_properties = match map.remove("ResourceProperties") {
            Some(properties) => properties,
            None => Value::Object(map),
        };

        Ok(Self {
            request_type,
            physical_resource_id,
            resource_properties,
        })
    }

    /// Whether this is a `Delete` request.
    pub fn is_delete(&self) -> bool {
        self.request_type == RequestType::Delete
    }

    /// Physical id from the event, or `default` if absent.
    pub fn physical_resource_id_or(&self, default: &str) -> String {
        self.physical_resource_id
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    /// Deserialize the properties into a function's typed input.
    pub fn properties<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        T::deserialize(&self.resource_properties).map_err(EventError::InvalidProperties)
    }
}

impl<'de> Deserialize<'de> for ProvisioningEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Outcome status reported to the provisioning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// The step completed.
    #[serde(rename = "SUCCESS")]
    Success,
}

/// Successful result of a bootstrap function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningResponse {
    /// Physical id the provisioning system tracks the resource by.
    pub physical_resource_id: String,
    /// Always `SUCCESS`; failures are returned as errors.
    pub status: ResponseStatus,
    /// Informational attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl ProvisioningResponse {
    /// A successful response with no data.
    pub fn success(physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            status: ResponseStatus::Success,
            data: BTreeMap::new(),
        }
    }

    /// Attach a data attribute.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The `Message` attribute, if set.
    pub fn message(&self) -> Option<&str> {
        self.data.get("Message").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Props {
        db_name: String,
    }

    #[test]
    fn test_envelope_decoded() {
        let event = ProvisioningEvent::from_json(
            r#"{
                "RequestType": "Update",
                "PhysicalResourceId": "db.example/hindsight",
                "ResourceProperties": {"DbName": "hindsight"}
            }"#,
        )
        .unwrap();

        assert_eq!(event.request_type, RequestType::Update);
        assert_eq!(event.physical_resource_id.as_deref(), Some("db.example/hindsight"));
        assert_eq!(event.properties::<Props>().unwrap().db_name, "hindsight");
    }

    #[test]
    fn test_bare_properties_are_a_create() {
        let event = ProvisioningEvent::from_value(json!({"DbName": "hindsight"})).unwrap();

        assert_eq!(event.request_type, RequestType::Create);
        assert!(event.physical_resource_id.is_none());
        assert_eq!(event.properties::<Props>().unwrap().db_name, "hindsight");
    }

    #[test]
    fn test_invalid_events_rejected() {
        assert!(matches!(
            ProvisioningEvent::from_value(json!([1, 2])),
            Err(EventError::NotAnObject)
        ));
        assert!(matches!(
            ProvisioningEvent::from_json("{not json"),
            Err(EventError::Json(_))
        ));
        assert!(ProvisioningEvent::from_value(json!({"RequestType": "Destroy"})).is_err());
    }

    #[test]
    fn test_missing_property_reported() {
        let event = ProvisioningEvent::create(json!({}));
        assert!(matches!(
            event.properties::<Props>(),
            Err(EventError::InvalidProperties(_))
        ));
    }

    #[test]
    fn test_deserialize_through_serde() {
        let event: ProvisioningEvent =
            serde_json::from_value(json!({"RequestType": "Delete"})).unwrap();
        assert!(event.is_delete());
        assert_eq!(event.physical_resource_id_or("fallback"), "fallback");
    }

    #[test]
    fn test_response_shape() {
        let response = ProvisioningResponse::success("arn:secret")
            .with_data("Message", "Database URL secret populated successfully");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "PhysicalResourceId": "arn:secret",
                "Status": "SUCCESS",
                "Data": {"Message": "Database URL secret populated successfully"}
            })
        );

        let bare = serde_json::to_value(ProvisioningResponse::success("x")).unwrap();
        assert!(bare.get("Data").is_none());
    }
}
