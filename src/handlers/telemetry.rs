//! Telemetry HTTP handlers.
//!
//! This module implements the telemetry API endpoints:
//! - POST /telemetry - Ingest one reading
//! - GET /telemetry - Query a device's readings within a time range

use crate::{
    AppState,
    db::DbPool,
    error::AppError,
    models::telemetry::{IngestRequest, TelemetryQuery, TelemetryReading, current_timestamp},
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::{Value, json};

/// Ingest one telemetry reading.
///
/// # Endpoint
///
/// `POST /telemetry`
///
/// # Request Body
///
/// ```json
/// {
///   "deviceId": "tractor-001",
///   "latitude": 30.7749,
///   "longitude": -100.4194,
///   "temperature": 26.5,
///   "timestamp": "2025-05-22T14:30:00Z"  // optional
/// }
/// ```
///
/// # Behavior
///
/// - `deviceId` and at least one measurement field are required (400)
/// - A missing `timestamp` is assigned from the arrival time; a supplied one
///   is stored verbatim
/// - A reading with the same `(deviceId, timestamp)` as an existing one
///   overwrites it (last-write-wins, no merge)
/// - When a telemetry TTL is configured, the reading expires after it
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "message": "Telemetry data stored successfully",
///   "deviceId": "tractor-001",
///   "timestamp": "2025-05-22T14:30:00Z"
/// }
/// ```
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<Value>, AppError> {
    let device_id = request
        .device_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing required field: deviceId".to_string()))?
        .to_string();

    if !request.has_measurement() {
        return Err(AppError::InvalidRequest(
            "At least one measurement field is required".to_string(),
        ));
    }

    // Use provided timestamp or current time; supplied values are taken
    // verbatim
    let timestamp = request
        .timestamp
        .clone()
        .unwrap_or_else(current_timestamp);

    let expires_at = state
        .telemetry_ttl_seconds
        .map(|ttl| chrono::Utc::now() + chrono::Duration::seconds(ttl));

    // Last write for a (device_id, ts) pair wins
    sqlx::query(
        r#"
        INSERT INTO telemetry (device_id, ts, latitude, longitude, temperature, extra, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (device_id, ts) DO UPDATE SET
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude,
            temperature = EXCLUDED.temperature,
            extra = EXCLUDED.extra,
            expires_at = EXCLUDED.expires_at
        "#,
    )
    .bind(&device_id)
    .bind(&timestamp)
    .bind(request.latitude)
    .bind(request.longitude)
    .bind(request.temperature)
    .bind(request.extra_json())
    .bind(expires_at)
    .execute(&state.pool)
    .await?;

    tracing::info!(device_id, timestamp, "Stored telemetry reading");

    Ok(Json(json!({
        "message": "Telemetry data stored successfully",
        "deviceId": device_id,
        "timestamp": timestamp
    })))
}

/// Query a device's telemetry readings.
///
/// # Endpoint
///
/// `GET /telemetry?deviceId=&startTime=&endTime=&limit=`
///
/// # Query Parameters
///
/// - `deviceId` (required): device to query
/// - `startTime`, `endTime` (optional): inclusive ISO-8601 bounds; each may
///   be supplied independently
/// - `limit` (optional): caps the number of readings; an unparsable value is
///   ignored. No pagination token is exposed: readings beyond the limit are
///   not reachable through this endpoint.
///
/// # Ordering
///
/// Readings are returned **newest first** (descending timestamp). Clients
/// rely on this: the first element is a device's most recent position.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "deviceId": "tractor-001",
///   "count": 2,
///   "telemetry": [
///     { "deviceId": "tractor-001", "timestamp": "...", "temperature": 26.5 },
///     { "deviceId": "tractor-001", "timestamp": "...", "temperature": 25.9 }
///   ]
/// }
/// ```
pub async fn get_telemetry(
    State(pool): State<DbPool>,
    Query(params): Query<TelemetryQuery>,
) -> Result<Json<Value>, AppError> {
    let device_id = params.device_id.as_deref().ok_or_else(|| {
        AppError::InvalidRequest("Missing required parameter: deviceId".to_string())
    })?;

    // None binds as LIMIT NULL, which Postgres treats as no limit
    let limit = params.parse_limit();

    const BASE: &str = "SELECT device_id, ts, latitude, longitude, temperature, extra \
         FROM telemetry \
         WHERE device_id = $1 AND (expires_at IS NULL OR expires_at > NOW())";

    // Both time bounds are inclusive; canonical ISO-8601 UTC strings compare
    // correctly as text
    let readings: Vec<TelemetryReading> =
        match (params.start_time.as_deref(), params.end_time.as_deref()) {
            (Some(start), Some(end)) => {
                sqlx::query_as(&format!(
                    "{BASE} AND ts >= $2 AND ts <= $3 ORDER BY ts DESC LIMIT $4"
                ))
                .bind(device_id)
                .bind(start)
                .bind(end)
                .bind(limit)
                .fetch_all(&pool)
                .await?
            }
            (Some(start), None) => {
                sqlx::query_as(&format!("{BASE} AND ts >= $2 ORDER BY ts DESC LIMIT $3"))
                    .bind(device_id)
                    .bind(start)
                    .bind(limit)
                    .fetch_all(&pool)
                    .await?
            }
            (None, Some(end)) => {
                sqlx::query_as(&format!("{BASE} AND ts <= $2 ORDER BY ts DESC LIMIT $3"))
                    .bind(device_id)
                    .bind(end)
                    .bind(limit)
                    .fetch_all(&pool)
                    .await?
            }
            (None, None) => {
                sqlx::query_as(&format!("{BASE} ORDER BY ts DESC LIMIT $2"))
                    .bind(device_id)
                    .bind(limit)
                    .fetch_all(&pool)
                    .await?
            }
        };

    tracing::info!(
        device_id,
        count = readings.len(),
        "Retrieved telemetry readings"
    );

    let telemetry: Vec<Value> = readings
        .into_iter()
        .map(TelemetryReading::into_json)
        .collect();

    Ok(Json(json!({
        "deviceId": device_id,
        "count": telemetry.len(),
        "telemetry": telemetry
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_state(pool: &DbPool, ttl: Option<i64>) -> AppState {
        AppState {
            pool: pool.clone(),
            telemetry_ttl_seconds: ttl,
        }
    }

    async fn ingest(state: &AppState, body: Value) {
        let request: IngestRequest = serde_json::from_value(body).unwrap();
        ingest_telemetry(State(state.clone()), Json(request))
            .await
            .expect("Failed to store reading");
    }

    async fn query(pool: &DbPool, params: Value) -> Value {
        let params: TelemetryQuery = serde_json::from_value(params).unwrap();
        get_telemetry(State(pool.clone()), Query(params))
            .await
            .expect("Failed to query readings")
            .0
    }

    #[sqlx::test]
    async fn test_query_returns_newest_first(pool: DbPool) {
        let state = app_state(&pool, None);

        // Ingested out of chronological order
        for ts in [
            "2025-05-22T14:00:00Z",
            "2025-05-22T14:30:00Z",
            "2025-05-22T14:15:00Z",
        ] {
            ingest(
                &state,
                json!({ "deviceId": "tractor-001", "temperature": 26.5, "timestamp": ts }),
            )
            .await;
        }

        let body = query(&pool, json!({ "deviceId": "tractor-001" })).await;
        assert_eq!(body["count"], json!(3));

        let timestamps: Vec<&str> = body["telemetry"]
            .as_array()
            .unwrap()
            .iter()
            .map(|reading| reading["timestamp"].as_str().unwrap())
            .collect();
        assert_eq!(
            timestamps,
            vec![
                "2025-05-22T14:30:00Z",
                "2025-05-22T14:15:00Z",
                "2025-05-22T14:00:00Z",
            ]
        );
    }

    #[sqlx::test]
    async fn test_query_limit_caps_results(pool: DbPool) {
        let state = app_state(&pool, None);

        for ts in [
            "2025-05-22T14:00:00Z",
            "2025-05-22T14:15:00Z",
            "2025-05-22T14:30:00Z",
        ] {
            ingest(
                &state,
                json!({ "deviceId": "tractor-001", "temperature": 26.5, "timestamp": ts }),
            )
            .await;
        }

        let body = query(&pool, json!({ "deviceId": "tractor-001", "limit": "2" })).await;
        assert_eq!(body["count"], json!(2));

        // The cap keeps the newest readings
        assert_eq!(
            body["telemetry"][0]["timestamp"],
            json!("2025-05-22T14:30:00Z")
        );
        assert_eq!(
            body["telemetry"][1]["timestamp"],
            json!("2025-05-22T14:15:00Z")
        );
    }

    #[sqlx::test]
    async fn test_expired_readings_excluded(pool: DbPool) {
        // A negative retention window stamps the reading already expired
        let expired = app_state(&pool, Some(-3600));
        ingest(
            &expired,
            json!({
                "deviceId": "tractor-001",
                "temperature": 25.9,
                "timestamp": "2025-05-22T14:00:00Z"
            }),
        )
        .await;

        let live = app_state(&pool, Some(3600));
        ingest(
            &live,
            json!({
                "deviceId": "tractor-001",
                "temperature": 26.5,
                "timestamp": "2025-05-22T14:30:00Z"
            }),
        )
        .await;

        let body = query(&pool, json!({ "deviceId": "tractor-001" })).await;
        assert_eq!(body["count"], json!(1));
        assert_eq!(
            body["telemetry"][0]["timestamp"],
            json!("2025-05-22T14:30:00Z")
        );
    }

    #[sqlx::test]
    async fn test_reading_round_trips_with_extra_fields(pool: DbPool) {
        let state = app_state(&pool, None);
        ingest(
            &state,
            json!({
                "deviceId": "tractor-001",
                "latitude": 30.7749,
                "longitude": -100.4194,
                "engineRpm": 1800,
                "timestamp": "2025-05-22T14:30:00Z"
            }),
        )
        .await;

        let body = query(&pool, json!({ "deviceId": "tractor-001" })).await;
        let reading = &body["telemetry"][0];

        assert_eq!(reading["latitude"], json!(30.7749));
        assert_eq!(reading["longitude"], json!(-100.4194));
        assert_eq!(reading["engineRpm"], json!(1800));
        // absent measurements stay absent
        assert!(reading.get("temperature").is_none());
    }
}
