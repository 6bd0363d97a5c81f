//! Company data models and API request/response types.
//!
//! This module defines:
//! - `Company`: Database entity representing a tenant
//! - Request types for creating and updating companies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a company record from the database.
///
/// # Database Table
///
/// Maps to the `companies` table. A company is a tenant: it owns devices,
/// and users gain visibility into it through user-company associations.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Unique identifier, generated as `comp-<uuid4>` at creation
    pub company_id: String,

    /// Company name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Id of the user who created the company
    pub created_by: Option<String>,

    /// Timestamp when the company was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last update
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a company.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Acme Farms",
///   "description": "West Texas operations"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    /// Company name (required; enforced by the handler)
    pub name: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// Request body for updating a company.
///
/// Update is a **full replace** of the mutable attributes: `name` is
/// required and `description` falls back to the empty string when omitted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    pub company_id: Option<String>,
    pub name: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// Request body for deleting a company.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCompanyRequest {
    pub company_id: Option<String>,
}
