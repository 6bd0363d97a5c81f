//! Device service - device lifecycle and telemetry joins.
//!
//! This service handles:
//! - Attaching each device's newest reading to device listings
//! - Deleting a device together with its stored telemetry

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        device::{Device, DeviceWithTelemetry},
        telemetry::TelemetryReading,
    },
};

/// Fetch the newest non-expired reading for a device, if any.
pub async fn latest_reading(
    pool: &DbPool,
    device_id: &str,
) -> Result<Option<TelemetryReading>, AppError> {
    let reading = sqlx::query_as::<_, TelemetryReading>(
        r#"
        SELECT device_id, ts, latitude, longitude, temperature, extra
        FROM telemetry
        WHERE device_id = $1 AND (expires_at IS NULL OR expires_at > NOW())
        ORDER BY ts DESC
        LIMIT 1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(reading)
}

/// Attach each device's most recent reading for the listing endpoint.
///
/// A failure to read one device's telemetry is logged and leaves that
/// device's `lastTelemetry` null; it does not fail the listing.
pub async fn attach_latest_telemetry(
    pool: &DbPool,
    devices: Vec<Device>,
) -> Vec<DeviceWithTelemetry> {
    let mut entries = Vec::with_capacity(devices.len());

    for device in devices {
        let last_telemetry = match latest_reading(pool, &device.device_id).await {
            Ok(reading) => reading.map(TelemetryReading::into_json),
            Err(e) => {
                tracing::error!(
                    device_id = %device.device_id,
                    error = %e,
                    "Failed to fetch latest telemetry"
                );
                None
            }
        };

        entries.push(DeviceWithTelemetry {
            device,
            last_telemetry,
        });
    }

    entries
}

/// Delete a device and purge its telemetry.
///
/// The telemetry purge runs first so that a retry after a mid-delete failure
/// still finds the device row and can finish the job. Deleting a device that
/// does not exist is a no-op.
pub async fn delete_device(pool: &DbPool, device_id: &str) -> Result<(), AppError> {
    let purged = sqlx::query("DELETE FROM telemetry WHERE device_id = $1")
        .bind(device_id)
        .execute(pool)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM devices WHERE device_id = $1")
        .bind(device_id)
        .execute(pool)
        .await?;

    tracing::info!(device_id, purged_readings = purged, "Deleted device");

    Ok(())
}
