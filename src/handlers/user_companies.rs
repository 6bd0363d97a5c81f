//! User-company association HTTP handlers.
//!
//! This module implements the association API endpoints:
//! - GET /user-company - Companies for a user, or members of a company
//! - POST /user-company - Assign a user to a company (admin only)
//! - DELETE /user-company - Remove a user from a company (admin only)

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        company::Company,
        user_company::{AssignUserRequest, CompanyMember, UserCompanyQuery},
    },
    services::authz,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde_json::{Value, json};

/// Look up user-company relationships.
///
/// # Endpoint
///
/// `GET /user-company?userId=` or `?companyId=` or no parameters
///
/// # Behavior
///
/// - `?userId=`: the companies that user belongs to. Callers may only query
///   themselves unless they are global admins (403).
/// - `?companyId=`: the members of that company, as `{userId, role}` pairs.
///   The caller must belong to the company or be a global admin (403).
/// - No parameters: the companies of the authenticated caller.
///
/// Company lists resolve each association against the company registry;
/// associations whose company record has disappeared are skipped.
pub async fn get_associations(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<UserCompanyQuery>,
) -> Result<Json<Value>, AppError> {
    if let Some(user_id) = params.user_id.as_deref() {
        // Users may only see their own memberships
        if user_id != auth.user_id && !auth.is_admin {
            return Err(AppError::Forbidden(
                "You can only query your own user-company relationships".to_string(),
            ));
        }

        let companies = companies_for_user(&pool, user_id).await?;
        return Ok(Json(json!({
            "userId": user_id,
            "companies": companies
        })));
    }

    if let Some(company_id) = params.company_id.as_deref() {
        if !auth.is_admin && !authz::is_member(&pool, &auth.user_id, company_id).await? {
            return Err(AppError::Forbidden(
                "You can only query companies you belong to".to_string(),
            ));
        }

        let users = sqlx::query_as::<_, CompanyMember>(
            "SELECT user_id, role FROM user_companies WHERE company_id = $1 ORDER BY user_id",
        )
        .bind(company_id)
        .fetch_all(&pool)
        .await?;

        return Ok(Json(json!({
            "companyId": company_id,
            "users": users
        })));
    }

    // No parameters: the caller's own companies
    let companies = companies_for_user(&pool, &auth.user_id).await?;
    Ok(Json(json!({
        "userId": auth.user_id,
        "companies": companies
    })))
}

/// Assign a user to a company.
///
/// # Endpoint
///
/// `POST /user-company`
///
/// # Request Body
///
/// ```json
/// {
///   "userId": "f3b2...",
///   "companyId": "comp-...",
///   "role": "user"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: assignment recorded (re-assigning updates the role)
/// - **400**: `userId` or `companyId` missing
/// - **403**: caller is not a global admin
/// - **404**: unknown company
pub async fn assign_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AssignUserRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = request.user_id.as_deref().ok_or_else(|| {
        AppError::InvalidRequest("Missing required parameters: userId and companyId".to_string())
    })?;
    let company_id = request.company_id.as_deref().ok_or_else(|| {
        AppError::InvalidRequest("Missing required parameters: userId and companyId".to_string())
    })?;

    authz::require_global_admin(&auth).await?;

    // The association must point at a real company
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE company_id = $1)")
            .bind(company_id)
            .fetch_one(&pool)
            .await?;
    if !exists {
        return Err(AppError::CompanyNotFound);
    }

    // Re-assigning an existing pair updates the role
    sqlx::query(
        r#"
        INSERT INTO user_companies (user_id, company_id, role, created_by)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, company_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(user_id)
    .bind(company_id)
    .bind(&request.role)
    .bind(&auth.user_id)
    .execute(&pool)
    .await?;

    tracing::info!(user_id, company_id, role = %request.role, "Assigned user to company");

    Ok(Json(json!({
        "message": format!("User {user_id} assigned to company {company_id} with role {}", request.role),
        "userId": user_id,
        "companyId": company_id,
        "role": request.role
    })))
}

/// Remove a user from a company.
///
/// # Endpoint
///
/// `DELETE /user-company?userId=&companyId=`
///
/// Idempotent: removing an association that does not exist responds 200.
pub async fn remove_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<UserCompanyQuery>,
) -> Result<Json<Value>, AppError> {
    let (user_id, company_id) = match (params.user_id.as_deref(), params.company_id.as_deref()) {
        (Some(user_id), Some(company_id)) => (user_id, company_id),
        _ => {
            return Err(AppError::InvalidRequest(
                "Missing required parameters: userId and companyId".to_string(),
            ));
        }
    };

    authz::require_global_admin(&auth).await?;

    sqlx::query("DELETE FROM user_companies WHERE user_id = $1 AND company_id = $2")
        .bind(user_id)
        .bind(company_id)
        .execute(&pool)
        .await?;

    tracing::info!(user_id, company_id, "Removed user from company");

    Ok(Json(json!({
        "message": format!("User {user_id} removed from company {company_id}"),
        "userId": user_id,
        "companyId": company_id
    })))
}

/// Resolve a user's associations to full company records.
async fn companies_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Company>, AppError> {
    let companies = sqlx::query_as::<_, Company>(
        r#"
        SELECT c.company_id, c.name, c.description, c.created_by, c.created_at, c.updated_at
        FROM companies c
        JOIN user_companies uc ON uc.company_id = c.company_id
        WHERE uc.user_id = $1
        ORDER BY c.company_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(companies)
}
