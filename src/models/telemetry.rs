//! Telemetry data models and API request/response types.
//!
//! This module defines:
//! - `TelemetryReading`: Database entity representing one stored reading
//! - `IngestRequest`: Request body for ingesting readings
//! - `TelemetryQuery`: Query parameters for the retrieval endpoint

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Request body for ingesting one telemetry reading.
///
/// # JSON Example
///
/// ```json
/// {
///   "deviceId": "tractor-001",
///   "latitude": 30.7749,
///   "longitude": -100.4194,
///   "temperature": 26.5,
///   "engineRpm": 1800,
///   "timestamp": "2025-05-22T14:30:00Z"
/// }
/// ```
///
/// # Validation
///
/// - `deviceId`: Required
/// - At least one measurement field must be present (latitude, longitude,
///   temperature, or any device-type-specific field)
/// - `timestamp`: Optional; the reading is stamped with the arrival time when
///   absent. A supplied value is stored verbatim, without well-formedness
///   checks.
///
/// All fields are optional at the serde level so that missing required
/// fields produce a 400 from the handler's own validation rather than a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Device the reading belongs to
    pub device_id: Option<String>,

    /// ISO-8601 timestamp; assigned from the arrival time when absent
    pub timestamp: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<f64>,

    /// Device-type-specific measurements (engineRpm, batteryLevel,
    /// soilMoisture, ...), captured as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IngestRequest {
    /// Whether the request carries at least one measurement field.
    pub fn has_measurement(&self) -> bool {
        self.latitude.is_some()
            || self.longitude.is_some()
            || self.temperature.is_some()
            || !self.extra.is_empty()
    }

    /// The extra fields as a JSONB column value, or None when there are none.
    pub fn extra_json(&self) -> Option<Value> {
        if self.extra.is_empty() {
            None
        } else {
            Some(Value::Object(self.extra.clone()))
        }
    }
}

/// Produce an ISO-8601 UTC timestamp for readings that arrive without one.
///
/// The format matches what devices send (`2025-05-22T14:30:00.123456Z`) so
/// that server-assigned and device-assigned timestamps sort consistently as
/// strings.
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Query parameters for `GET /telemetry`.
///
/// `limit` is kept as a raw string: an unparsable value is logged and
/// ignored rather than rejected, matching the ingest contract's lenient
/// treatment of client-supplied values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryQuery {
    /// Device to query (required; enforced by the handler)
    pub device_id: Option<String>,

    /// Inclusive lower bound on timestamps
    pub start_time: Option<String>,

    /// Inclusive upper bound on timestamps
    pub end_time: Option<String>,

    /// Maximum number of readings to return
    pub limit: Option<String>,
}

impl TelemetryQuery {
    /// Parse the limit parameter, ignoring values that are not positive
    /// integers.
    pub fn parse_limit(&self) -> Option<i64> {
        let raw = self.limit.as_deref()?;
        match raw.parse::<i64>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                tracing::warn!(limit = raw, "Ignoring invalid limit parameter");
                None
            }
        }
    }
}

/// Represents a telemetry reading record from the database.
///
/// # Database Table
///
/// Maps to the `telemetry` table, keyed by `(device_id, ts)`. The timestamp
/// is the verbatim string the reading was stored under; device-type-specific
/// fields live in the `extra` JSONB column.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TelemetryReading {
    pub device_id: String,
    pub ts: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<f64>,
    pub extra: Option<Value>,
}

impl TelemetryReading {
    /// Render the reading as the flat JSON object clients consume.
    ///
    /// Extra fields are folded back into the top-level object, so a reading
    /// round-trips through storage in the same shape it was ingested.
    pub fn into_json(self) -> Value {
        let mut object = Map::new();
        object.insert("deviceId".to_string(), json!(self.device_id));
        object.insert("timestamp".to_string(), json!(self.ts));

        if let Some(latitude) = self.latitude {
            object.insert("latitude".to_string(), json!(latitude));
        }
        if let Some(longitude) = self.longitude {
            object.insert("longitude".to_string(), json!(longitude));
        }
        if let Some(temperature) = self.temperature {
            object.insert("temperature".to_string(), json!(temperature));
        }

        if let Some(Value::Object(extra)) = self.extra {
            for (key, value) in extra {
                object.entry(key).or_insert(value);
            }
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_request_captures_extra_fields() {
        let request: IngestRequest = serde_json::from_value(json!({
            "deviceId": "tractor-001",
            "latitude": 30.7749,
            "longitude": -100.4194,
            "temperature": 26.5,
            "engineRpm": 1800,
            "soilMoisture": 0.32,
        }))
        .unwrap();

        assert_eq!(request.device_id.as_deref(), Some("tractor-001"));
        assert!(request.has_measurement());
        assert_eq!(request.extra.len(), 2);
        assert_eq!(request.extra["engineRpm"], json!(1800));
    }

    #[test]
    fn test_ingest_request_without_measurements() {
        let request: IngestRequest = serde_json::from_value(json!({
            "deviceId": "tractor-001",
            "timestamp": "2025-05-22T14:30:00Z",
        }))
        .unwrap();

        // timestamp is not a measurement
        assert!(!request.has_measurement());
        assert!(request.extra_json().is_none());
    }

    #[test]
    fn test_current_timestamp_format() {
        let ts = current_timestamp();
        assert!(ts.ends_with('Z'));
        // "YYYY-MM-DDTHH:MM:SS.ffffffZ"
        assert_eq!(ts.len(), 27);
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_parse_limit() {
        let query = |limit: Option<&str>| TelemetryQuery {
            device_id: Some("dev-1".to_string()),
            start_time: None,
            end_time: None,
            limit: limit.map(str::to_string),
        };

        assert_eq!(query(Some("10")).parse_limit(), Some(10));
        assert_eq!(query(Some("abc")).parse_limit(), None);
        assert_eq!(query(Some("-3")).parse_limit(), None);
        assert_eq!(query(Some("0")).parse_limit(), None);
        assert_eq!(query(None).parse_limit(), None);
    }

    #[test]
    fn test_reading_round_trips_flat() {
        let reading = TelemetryReading {
            device_id: "tractor-001".to_string(),
            ts: "2025-05-22T14:30:00Z".to_string(),
            latitude: Some(30.7749),
            longitude: Some(-100.4194),
            temperature: None,
            extra: Some(json!({ "batteryLevel": 87 })),
        };

        let value = reading.into_json();
        assert_eq!(value["deviceId"], json!("tractor-001"));
        assert_eq!(value["timestamp"], json!("2025-05-22T14:30:00Z"));
        assert_eq!(value["latitude"], json!(30.7749));
        assert_eq!(value["batteryLevel"], json!(87));
        // absent measurements stay absent
        assert!(value.get("temperature").is_none());
    }
}
