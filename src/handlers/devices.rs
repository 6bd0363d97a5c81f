//! Device management HTTP handlers.
//!
//! This module implements the device-related API endpoints:
//! - GET /devices - List devices (optionally per company), with last telemetry
//! - GET /device - Get one device by id
//! - POST /devices - Register a new device
//! - PUT /devices - Update a device (full replace of mutable fields)
//! - DELETE /devices - Delete a device and purge its telemetry

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::device::{Device, RegisterDeviceRequest, UpdateDeviceRequest},
    services::{authz, device_service},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Query parameters for the device listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesQuery {
    pub company_id: Option<String>,
}

/// Query parameters for the single-device endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdQuery {
    pub device_id: Option<String>,
}

/// List devices, each with its most recent telemetry reading.
///
/// # Endpoint
///
/// `GET /devices?companyId=`
///
/// # Scoping
///
/// - With `companyId`: the caller must be associated with that company
///   (403 otherwise); lists its devices.
/// - Without: lists devices across every company the caller belongs to.
///   Global admins see all devices.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "count": 1,
///   "devices": [
///     { "deviceId": "tractor-001", "companyId": "comp-...", "lastTelemetry": { ... } }
///   ]
/// }
/// ```
pub async fn list_devices(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListDevicesQuery>,
) -> Result<Json<Value>, AppError> {
    let devices = match params.company_id.as_deref() {
        Some(company_id) => {
            // A deleted company has nothing left to protect; listing its
            // devices yields an empty list rather than 403
            let company_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE company_id = $1)")
                    .bind(company_id)
                    .fetch_one(&pool)
                    .await?;
            if company_exists {
                authz::require_member(&pool, &auth, company_id).await?;
            }

            sqlx::query_as::<_, Device>(
                r#"
                SELECT device_id, company_id, name, description, created_by, created_at, updated_at
                FROM devices
                WHERE company_id = $1
                ORDER BY device_id
                "#,
            )
            .bind(company_id)
            .fetch_all(&pool)
            .await?
        }
        None if auth.is_admin => {
            sqlx::query_as::<_, Device>(
                r#"
                SELECT device_id, company_id, name, description, created_by, created_at, updated_at
                FROM devices
                ORDER BY device_id
                "#,
            )
            .fetch_all(&pool)
            .await?
        }
        None => {
            // Devices across every company the caller belongs to
            sqlx::query_as::<_, Device>(
                r#"
                SELECT d.device_id, d.company_id, d.name, d.description,
                       d.created_by, d.created_at, d.updated_at
                FROM devices d
                JOIN user_companies uc ON uc.company_id = d.company_id
                WHERE uc.user_id = $1
                ORDER BY d.device_id
                "#,
            )
            .bind(&auth.user_id)
            .fetch_all(&pool)
            .await?
        }
    };

    tracing::info!(count = devices.len(), "Retrieved devices");

    let entries = device_service::attach_latest_telemetry(&pool, devices).await;

    Ok(Json(json!({
        "count": entries.len(),
        "devices": entries
    })))
}

/// Get one device by id.
///
/// # Endpoint
///
/// `GET /device?deviceId=`
///
/// # Response
///
/// - **200 OK**: `{ "device": { ... } }`
/// - **400**: `deviceId` missing
/// - **403**: caller not associated with the device's company
/// - **404**: unknown device
pub async fn get_device(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<DeviceIdQuery>,
) -> Result<Json<Value>, AppError> {
    let device_id = params
        .device_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Device ID is required".to_string()))?;

    let device = fetch_device(&pool, device_id)
        .await?
        .ok_or(AppError::DeviceNotFound)?;

    authz::require_member(&pool, &auth, &device.company_id).await?;

    Ok(Json(json!({ "device": device })))
}

/// Register a new device.
///
/// # Endpoint
///
/// `POST /devices`
///
/// # Request Body
///
/// ```json
/// {
///   "deviceId": "tractor-001",
///   "companyId": "comp-...",
///   "name": "North field tractor",
///   "description": ""
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: `{ "message": ..., "device": { ... } }`
/// - **400**: `deviceId` or `companyId` missing
/// - **403**: caller not associated with `companyId`
/// - **409**: a device with this id already exists
pub async fn register_device(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<Value>, AppError> {
    let device_id = request
        .device_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Device ID is required".to_string()))?;
    let company_id = request
        .company_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Company ID is required".to_string()))?;

    authz::require_member(&pool, &auth, company_id).await?;

    // ON CONFLICT DO NOTHING makes the existence check and insert one
    // statement; no row back means the id was taken
    let device = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (device_id, company_id, name, description, created_by)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (device_id) DO NOTHING
        RETURNING device_id, company_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(device_id)
    .bind(company_id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(&auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::DeviceExists(device_id.to_string()))?;

    tracing::info!(device_id, company_id, "Registered device");

    Ok(Json(json!({
        "message": "Device registered successfully",
        "device": device
    })))
}

/// Update a device.
///
/// # Endpoint
///
/// `PUT /devices`
///
/// # Semantics
///
/// Full replace of the mutable attributes: `name` and `description` are set
/// to exactly the supplied values, and an omitted field becomes the empty
/// string. `deviceId` and `companyId` are immutable.
///
/// # Response
///
/// - **200 OK**: `{ "message": ..., "device": { ... } }`
/// - **400**: `deviceId` missing
/// - **403**: caller not associated with the device's company
/// - **404**: unknown device
pub async fn update_device(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateDeviceRequest>,
) -> Result<Json<Value>, AppError> {
    let device_id = request
        .device_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Device ID is required".to_string()))?;

    let existing = fetch_device(&pool, device_id)
        .await?
        .ok_or(AppError::DeviceNotFound)?;

    authz::require_member(&pool, &auth, &existing.company_id).await?;

    let device = sqlx::query_as::<_, Device>(
        r#"
        UPDATE devices
        SET name = $2, description = $3, updated_at = NOW()
        WHERE device_id = $1
        RETURNING device_id, company_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(device_id)
    .bind(&request.name)
    .bind(&request.description)
    .fetch_one(&pool)
    .await?;

    tracing::info!(device_id, "Updated device");

    Ok(Json(json!({
        "message": "Device updated successfully",
        "device": device
    })))
}

/// Delete a device and purge its telemetry.
///
/// # Endpoint
///
/// `DELETE /devices?deviceId=`
///
/// # Idempotency
///
/// Deleting an id that does not exist responds 200, not 404, so a retry
/// after a partial failure always converges.
pub async fn delete_device(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<DeviceIdQuery>,
) -> Result<Json<Value>, AppError> {
    let device_id = params
        .device_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Device ID is required".to_string()))?;

    // The association check only applies when the device still exists;
    // deleting an unknown id is a successful no-op
    if let Some(device) = fetch_device(&pool, device_id).await? {
        authz::require_member(&pool, &auth, &device.company_id).await?;
        device_service::delete_device(&pool, device_id).await?;
    }

    Ok(Json(json!({ "message": "Device deleted successfully" })))
}

/// Point read of one device row.
async fn fetch_device(pool: &DbPool, device_id: &str) -> Result<Option<Device>, AppError> {
    let device = sqlx::query_as::<_, Device>(
        r#"
        SELECT device_id, company_id, name, description, created_by, created_at, updated_at
        FROM devices
        WHERE device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AuthContext {
        AuthContext {
            user_id: "test-admin".to_string(),
            email: None,
            username: None,
            is_admin: true,
        }
    }

    #[sqlx::test]
    async fn test_update_is_full_replace(pool: DbPool) {
        let register: RegisterDeviceRequest = serde_json::from_value(json!({
            "deviceId": "tractor-001",
            "companyId": "comp-1",
            "name": "North field tractor",
            "description": "John Deere 8R",
        }))
        .unwrap();
        register_device(State(pool.clone()), Extension(admin()), Json(register))
            .await
            .expect("Failed to register device");

        // description omitted: the update must clear it, not preserve it
        let update: UpdateDeviceRequest = serde_json::from_value(json!({
            "deviceId": "tractor-001",
            "name": "South field tractor",
        }))
        .unwrap();
        update_device(State(pool.clone()), Extension(admin()), Json(update))
            .await
            .expect("Failed to update device");

        let (name, description): (String, String) =
            sqlx::query_as("SELECT name, description FROM devices WHERE device_id = $1")
                .bind("tractor-001")
                .fetch_one(&pool)
                .await
                .expect("Failed to retrieve device");

        assert_eq!(name, "South field tractor");
        assert_eq!(description, "");
    }
}
