//! User-company association models and API request types.
//!
//! An association grants a user visibility into one company's devices and
//! telemetry. The relation is many-to-many: the table is keyed by
//! `(user_id, company_id)` with a secondary index on `company_id` so both
//! "companies for user" and "users for company" are efficient.

use serde::{Deserialize, Serialize};

/// One member of a company, as returned by the membership listing.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMember {
    pub user_id: String,
    pub role: String,
}

/// Request body for assigning a user to a company.
///
/// # JSON Example
///
/// ```json
/// {
///   "userId": "f3b2...",
///   "companyId": "comp-550e8400-...",
///   "role": "user"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserRequest {
    pub user_id: Option<String>,
    pub company_id: Option<String>,

    /// Role within the company, defaults to "user"
    #[serde(default = "default_role")]
    pub role: String,
}

/// Default role when not specified in the request.
fn default_role() -> String {
    "user".to_string()
}

/// Query parameters for the association endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCompanyQuery {
    pub user_id: Option<String>,
    pub company_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assign_request_role_defaults_to_user() {
        let request: AssignUserRequest = serde_json::from_value(json!({
            "userId": "user-1",
            "companyId": "comp-1",
        }))
        .unwrap();

        assert_eq!(request.role, "user");
    }
}
