//! Company management HTTP handlers.
//!
//! This module implements the company-related API endpoints:
//! - GET /company - Get one company by id
//! - POST /company - Create a company (caller becomes its admin)
//! - PUT /company - Update a company (full replace of mutable fields)
//! - DELETE /company - Delete a company, cascading through its devices

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::company::{
        Company, CreateCompanyRequest, DeleteCompanyRequest, UpdateCompanyRequest,
    },
    services::{authz, company_service},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Query parameters for the company read endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyIdQuery {
    pub company_id: Option<String>,
}

/// Get one company by id.
///
/// # Endpoint
///
/// `GET /company?companyId=`
///
/// # Response
///
/// - **200 OK**: `{ "company": { ... } }`
/// - **400**: `companyId` missing
/// - **403**: caller not associated with the company
/// - **404**: unknown company
pub async fn get_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CompanyIdQuery>,
) -> Result<Json<Value>, AppError> {
    let company_id = params
        .company_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Company ID is required".to_string()))?;

    let company = fetch_company(&pool, company_id)
        .await?
        .ok_or(AppError::CompanyNotFound)?;

    authz::require_member(&pool, &auth, company_id).await?;

    Ok(Json(json!({ "company": company })))
}

/// Create a company.
///
/// # Endpoint
///
/// `POST /company`
///
/// The creator is associated with the new company in the `admin` role, in
/// the same database transaction as the company insert. Registering a
/// company is typically the first action after sign-up, so any
/// authenticated user may do it.
///
/// # Response
///
/// - **200 OK**: `{ "message": ..., "company": { ... } }`
/// - **400**: `name` missing
pub async fn create_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    let (name, description) = company_service::validate_create_request(request)?;

    let company = company_service::create_company(&pool, &auth, name, description).await?;

    Ok(Json(json!({
        "message": "Company created successfully",
        "company": company
    })))
}

/// Update a company.
///
/// # Endpoint
///
/// `PUT /company`
///
/// # Semantics
///
/// Full replace of the mutable attributes: `name` is required, and an
/// omitted `description` becomes the empty string. Requires the `admin`
/// role within the company.
///
/// # Response
///
/// - **200 OK**: `{ "message": ..., "company": { ... } }`
/// - **400**: `companyId` or `name` missing
/// - **403**: caller lacks the admin role for this company
/// - **404**: unknown company
pub async fn update_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    let company_id = request
        .company_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Company ID is required".to_string()))?;
    let name = request
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Company name is required".to_string()))?;

    authz::require_company_admin(&pool, &auth, company_id).await?;

    let company = sqlx::query_as::<_, Company>(
        r#"
        UPDATE companies
        SET name = $2, description = $3, updated_at = NOW()
        WHERE company_id = $1
        RETURNING company_id, name, description, created_by, created_at, updated_at
        "#,
    )
    .bind(company_id)
    .bind(name)
    .bind(&request.description)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::CompanyNotFound)?;

    tracing::info!(company_id, "Updated company");

    Ok(Json(json!({
        "message": "Company updated successfully",
        "company": company
    })))
}

/// Delete a company.
///
/// # Endpoint
///
/// `DELETE /company`
///
/// Cascades through the company's devices (and their telemetry) and its
/// user associations before removing the company row; see
/// `company_service::delete_company` for the ordering and failure handling.
/// Requires the `admin` role within the company. Idempotent: deleting an
/// already-deleted company responds 200.
pub async fn delete_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeleteCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    let company_id = request
        .company_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Company ID is required".to_string()))?;

    // An already-deleted company is a successful no-op; the authorization
    // check only applies while the company still exists
    if fetch_company(&pool, company_id).await?.is_some() {
        authz::require_company_admin(&pool, &auth, company_id).await?;
        company_service::delete_company(&pool, company_id).await?;
    }

    Ok(Json(json!({ "message": "Company deleted successfully" })))
}

/// Point read of one company row.
async fn fetch_company(pool: &DbPool, company_id: &str) -> Result<Option<Company>, AppError> {
    let company = sqlx::query_as::<_, Company>(
        r#"
        SELECT company_id, name, description, created_by, created_at, updated_at
        FROM companies
        WHERE company_id = $1
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    Ok(company)
}
