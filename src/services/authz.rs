//! Company-scoped authorization checks.
//!
//! Every device and company operation is scoped by company: before a handler
//! reads or mutates anything it verifies that the caller has an association
//! with the target company. Members of the global "admin" group bypass the
//! per-company checks.

use crate::{db::DbPool, error::AppError, middleware::auth::AuthContext};

/// Whether the user has any association with the company.
pub async fn is_member(pool: &DbPool, user_id: &str, company_id: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM user_companies WHERE user_id = $1 AND company_id = $2)",
    )
    .bind(user_id)
    .bind(company_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Require that the caller is associated with the company (any role).
///
/// # Errors
///
/// `AppError::Forbidden` when the caller is neither a member of the company
/// nor a global admin.
pub async fn require_member(
    pool: &DbPool,
    auth: &AuthContext,
    company_id: &str,
) -> Result<(), AppError> {
    if auth.is_admin || is_member(pool, &auth.user_id, company_id).await? {
        return Ok(());
    }

    tracing::warn!(
        user_id = %auth.user_id,
        company_id,
        "Denied access: no association with company"
    );
    Err(AppError::Forbidden(
        "You are not associated with this company".to_string(),
    ))
}

/// Require that the caller holds the `admin` role within the company.
///
/// Used by the destructive company operations (update, delete).
pub async fn require_company_admin(
    pool: &DbPool,
    auth: &AuthContext,
    company_id: &str,
) -> Result<(), AppError> {
    if auth.is_admin {
        return Ok(());
    }

    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM user_companies WHERE user_id = $1 AND company_id = $2")
            .bind(&auth.user_id)
            .bind(company_id)
            .fetch_optional(pool)
            .await?;

    match role.as_deref() {
        Some("admin") => Ok(()),
        _ => {
            tracing::warn!(
                user_id = %auth.user_id,
                company_id,
                "Denied access: admin role required"
            );
            Err(AppError::Forbidden(
                "You do not have permission to manage this company".to_string(),
            ))
        }
    }
}

/// Require that the caller belongs to the global "admin" group.
pub async fn require_global_admin(auth: &AuthContext) -> Result<(), AppError> {
    if auth.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only admins can manage user-company assignments".to_string(),
        ))
    }
}
