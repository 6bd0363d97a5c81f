//! Company service - company lifecycle logic.
//!
//! This service handles:
//! - Creating a company together with its creator's admin association
//! - The cascading company delete
//!
//! # Consistency
//!
//! Company creation is atomic (one database transaction inserts the company
//! and the creator's association). The cascade on delete is deliberately
//! not: it is a sequence of independent deletes in which per-step failures
//! are logged and skipped, so a retry makes further progress instead of
//! starting over. Every step is idempotent.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::company::{Company, CreateCompanyRequest},
};
use uuid::Uuid;

/// Create a company and associate its creator as an admin.
///
/// # Process
///
/// 1. Generate a `comp-<uuid4>` id
/// 2. Start database transaction
/// 3. Insert the company record
/// 4. Insert the creator's admin association
/// 5. Commit (or rollback on error)
pub async fn create_company(
    pool: &DbPool,
    auth: &AuthContext,
    name: String,
    description: String,
) -> Result<Company, AppError> {
    let company_id = format!("comp-{}", Uuid::new_v4());

    let mut tx = pool.begin().await?;

    let company = sqlx::query_as::<_, Company>(
        r#"
        INSERT INTO companies (company_id, name, description, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING company_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(&company_id)
    .bind(name)
    .bind(description)
    .bind(&auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    // The creator administers the new company
    sqlx::query(
        r#"
        INSERT INTO user_companies (user_id, company_id, role, created_by)
        VALUES ($1, $2, 'admin', $1)
        "#,
    )
    .bind(&auth.user_id)
    .bind(&company_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(company_id = %company_id, created_by = %auth.user_id, "Created company");

    Ok(company)
}

/// Validated form of a create request, or the reason it is invalid.
pub fn validate_create_request(
    request: CreateCompanyRequest,
) -> Result<(String, String), AppError> {
    let name = request
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Company name is required".to_string()))?;

    Ok((name, request.description))
}

/// Delete a company, cascading through its devices and associations.
///
/// # Order
///
/// 1. Telemetry of each of the company's devices
/// 2. The device rows
/// 3. The company row
/// 4. The user-company associations
///
/// Per-device failures are logged and skipped so that partial progress
/// survives a transient store error; a retry of the delete picks up
/// whatever remains. The associations go last: while the company row still
/// exists, the deleting admin's own association must survive so their retry
/// still passes the authorization check. A failure on the company row
/// itself is surfaced to the caller.
pub async fn delete_company(pool: &DbPool, company_id: &str) -> Result<(), AppError> {
    // Enumerate the company's devices first; the store has no native
    // cascading delete
    let device_ids: Vec<String> =
        sqlx::query_scalar("SELECT device_id FROM devices WHERE company_id = $1")
            .bind(company_id)
            .fetch_all(pool)
            .await?;

    for device_id in &device_ids {
        if let Err(e) = sqlx::query("DELETE FROM telemetry WHERE device_id = $1")
            .bind(device_id)
            .execute(pool)
            .await
        {
            tracing::error!(device_id = %device_id, error = %e, "Cascade: failed to purge telemetry");
            continue;
        }

        if let Err(e) = sqlx::query("DELETE FROM devices WHERE device_id = $1")
            .bind(device_id)
            .execute(pool)
            .await
        {
            tracing::error!(device_id = %device_id, error = %e, "Cascade: failed to delete device");
        }
    }

    sqlx::query("DELETE FROM companies WHERE company_id = $1")
        .bind(company_id)
        .execute(pool)
        .await?;

    if let Err(e) = sqlx::query("DELETE FROM user_companies WHERE company_id = $1")
        .bind(company_id)
        .execute(pool)
        .await
    {
        tracing::error!(company_id, error = %e, "Cascade: failed to delete associations");
    }

    tracing::info!(
        company_id,
        devices = device_ids.len(),
        "Deleted company and cascaded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::devices::{ListDevicesQuery, list_devices};
    use axum::{
        Extension,
        extract::{Query, State},
    };
    use serde_json::json;

    fn creator() -> AuthContext {
        AuthContext {
            user_id: "user-1".to_string(),
            email: None,
            username: None,
            is_admin: false,
        }
    }

    #[sqlx::test]
    async fn test_create_company_grants_creator_admin_role(pool: DbPool) {
        let company = create_company(&pool, &creator(), "Acme Farms".to_string(), String::new())
            .await
            .expect("Failed to create company");

        assert!(company.company_id.starts_with("comp-"));

        let role: String = sqlx::query_scalar(
            "SELECT role FROM user_companies WHERE user_id = $1 AND company_id = $2",
        )
        .bind("user-1")
        .bind(&company.company_id)
        .fetch_one(&pool)
        .await
        .expect("Failed to retrieve association");

        assert_eq!(role, "admin");
    }

    #[sqlx::test]
    async fn test_delete_company_cascades_to_devices_and_telemetry(pool: DbPool) {
        let auth = creator();
        let company = create_company(&pool, &auth, "Acme Farms".to_string(), String::new())
            .await
            .expect("Failed to create company");

        sqlx::query("INSERT INTO devices (device_id, company_id) VALUES ($1, $2)")
            .bind("tractor-001")
            .bind(&company.company_id)
            .execute(&pool)
            .await
            .expect("Failed to seed device");
        sqlx::query("INSERT INTO telemetry (device_id, ts, temperature) VALUES ($1, $2, $3)")
            .bind("tractor-001")
            .bind("2025-05-22T14:30:00Z")
            .bind(26.5)
            .execute(&pool)
            .await
            .expect("Failed to seed telemetry");

        delete_company(&pool, &company.company_id)
            .await
            .expect("Failed to delete company");

        let telemetry: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM telemetry WHERE device_id = $1")
                .bind("tractor-001")
                .fetch_one(&pool)
                .await
                .expect("Failed to count telemetry");
        assert_eq!(telemetry, 0);

        let associations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_companies WHERE company_id = $1")
                .bind(&company.company_id)
                .fetch_one(&pool)
                .await
                .expect("Failed to count associations");
        assert_eq!(associations, 0);

        // Listing the deleted company's devices yields an empty list
        let body = list_devices(
            State(pool.clone()),
            Extension(auth),
            Query(ListDevicesQuery {
                company_id: Some(company.company_id.clone()),
            }),
        )
        .await
        .expect("Failed to list devices")
        .0;

        assert_eq!(body["count"], json!(0));
    }

    #[test]
    fn test_validate_create_request_requires_name() {
        let missing = CreateCompanyRequest {
            name: None,
            description: String::new(),
        };
        assert!(matches!(
            validate_create_request(missing),
            Err(AppError::InvalidRequest(_))
        ));

        let empty = CreateCompanyRequest {
            name: Some(String::new()),
            description: String::new(),
        };
        assert!(validate_create_request(empty).is_err());

        let valid = CreateCompanyRequest {
            name: Some("Acme Farms".to_string()),
            description: "West Texas".to_string(),
        };
        let (name, description) = validate_create_request(valid).unwrap();
        assert_eq!(name, "Acme Farms");
        assert_eq!(description, "West Texas");
    }
}
