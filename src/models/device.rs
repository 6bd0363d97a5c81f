//! Device data models and API request/response types.
//!
//! This module defines:
//! - `Device`: Database entity representing a registered device
//! - Request types for registering and updating devices
//! - `DeviceWithTelemetry`: Device plus its newest reading, as returned by
//!   the device listing endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a device record from the database.
///
/// # Database Table
///
/// Maps to the `devices` table. Each device:
/// - Belongs to exactly one company (via `company_id`)
/// - Has an immutable, globally unique `device_id` chosen at registration
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique identifier for this device, chosen by the caller at
    /// registration and immutable afterwards
    pub device_id: String,

    /// Company this device belongs to
    ///
    /// All device operations are scoped by this field: a caller must be
    /// associated with the company to see or mutate the device.
    pub company_id: String,

    /// Human-readable name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Id of the user who registered the device
    pub created_by: Option<String>,

    /// Timestamp when the device was registered
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last update
    pub updated_at: DateTime<Utc>,
}

/// Request body for registering a new device.
///
/// # JSON Example
///
/// ```json
/// {
///   "deviceId": "tractor-001",
///   "companyId": "comp-550e8400-e29b-41d4-a716-446655440000",
///   "name": "North field tractor",
///   "description": "John Deere 8R"
/// }
/// ```
///
/// # Validation
///
/// - `deviceId`: Required; must not collide with an existing device
/// - `companyId`: Required; the caller must be associated with it
/// - `name`, `description`: Optional, default to empty strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_id: Option<String>,
    pub company_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Request body for updating a device.
///
/// Update is a **full replace** of the mutable attributes: `name` and
/// `description` are set to exactly the supplied values, and a field omitted
/// from the request is set to the empty string rather than preserved.
/// `deviceId` and `companyId` are immutable.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    pub device_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// A device together with its most recent telemetry reading.
///
/// Returned by the device listing endpoint so map clients can place each
/// device at its last known position without a second round trip.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceWithTelemetry {
    #[serde(flatten)]
    pub device: Device,

    /// The newest stored reading for this device, or null when the device
    /// has never reported
    pub last_telemetry: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_request_omitted_fields_become_empty() {
        let request: UpdateDeviceRequest =
            serde_json::from_value(json!({ "deviceId": "tractor-001" })).unwrap();

        assert_eq!(request.device_id.as_deref(), Some("tractor-001"));
        assert_eq!(request.name, "");
        assert_eq!(request.description, "");
    }

    #[test]
    fn test_device_serializes_camel_case_with_last_telemetry() {
        let entry = DeviceWithTelemetry {
            device: Device {
                device_id: "tractor-001".to_string(),
                company_id: "comp-1".to_string(),
                name: "North field tractor".to_string(),
                description: String::new(),
                created_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            last_telemetry: Some(json!({ "latitude": 30.0 })),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["deviceId"], json!("tractor-001"));
        assert_eq!(value["companyId"], json!("comp-1"));
        assert_eq!(value["lastTelemetry"]["latitude"], json!(30.0));
    }
}
