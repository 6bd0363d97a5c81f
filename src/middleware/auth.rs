//! Bearer token authentication middleware.
//!
//! Every protected request carries `Authorization: Bearer <token>`, where the
//! token is a JWT issued and signature-validated by the external identity
//! provider fronting this service. The middleware therefore does not
//! re-verify the signature; it decodes the claims segment, rejects expired
//! tokens, and injects the caller's identity into the request so route
//! handlers can scope their queries.

use crate::error::AppError;
use axum::{extract::Request, middleware::Next, response::Response};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

/// Claims carried in the identity provider's token.
///
/// Only the claims this service consumes are modeled; everything else in the
/// token is ignored. The `cognito:*` aliases accept tokens from user pools
/// that namespace their claims.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject: the stable user id
    pub sub: String,

    /// Email address, when the provider includes it
    #[serde(default)]
    pub email: Option<String>,

    /// Preferred username, when the provider includes it
    #[serde(default, alias = "cognito:username")]
    pub username: Option<String>,

    /// Group memberships; the "admin" group grants cross-tenant rights
    #[serde(default, alias = "cognito:groups")]
    pub groups: Vec<String>,

    /// Expiration time (seconds since epoch)
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Stable id of the authenticated user (the token's `sub` claim)
    ///
    /// Used to scope database queries (e.g., only show companies this user
    /// is associated with)
    pub user_id: String,

    /// Email of the authenticated user, if present in the token
    pub email: Option<String>,

    /// Username of the authenticated user, if present in the token
    pub username: Option<String>,

    /// Whether the user belongs to the global "admin" group
    pub is_admin: bool,
}

/// Decode the claims segment of a JWT without verifying its signature.
///
/// Signature verification is the identity provider's job; a token only
/// reaches this service after the fronting gateway has validated it. The
/// expiry claim is still checked so a replayed stale token is rejected.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the token is not a three-segment JWT,
/// the payload is not valid base64url JSON, or the token is expired.
pub fn decode_claims(token: &str) -> Result<Claims, AppError> {
    let mut segments = token.split('.');

    // header.payload.signature; the payload is the second segment
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return Err(AppError::Unauthorized),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AppError::Unauthorized)?;

    let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| AppError::Unauthorized)?;

    // Reject expired tokens
    if let Some(exp) = claims.exp {
        if exp <= chrono::Utc::now().timestamp() {
            tracing::warn!(sub = %claims.sub, "Rejected expired token");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(claims)
}

/// Bearer token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Decode the token's claims segment (expiry checked, signature trusted)
/// 3. If valid: inject `AuthContext` into request, call next handler
/// 4. If not: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer eyJhbGciOi...
/// ```
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Expected format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = decode_claims(token)?;

    let auth_context = AuthContext {
        user_id: claims.sub,
        email: claims.email,
        username: claims.username,
        is_admin: claims.groups.iter().any(|g| g == "admin"),
    };

    tracing::debug!(
        user_id = %auth_context.user_id,
        username = ?auth_context.username,
        email = ?auth_context.email,
        "Authenticated request"
    );

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_valid_token() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = make_token(json!({
            "sub": "user-1",
            "email": "farmer@example.com",
            "exp": exp,
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("farmer@example.com"));
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_decode_namespaced_claims() {
        let token = make_token(json!({
            "sub": "user-2",
            "cognito:username": "farmer2",
            "cognito:groups": ["admin"],
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.username.as_deref(), Some("farmer2"));
        assert_eq!(claims.groups, vec!["admin".to_string()]);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = make_token(json!({
            "sub": "user-1",
            "exp": chrono::Utc::now().timestamp() - 60,
        }));

        assert!(matches!(
            decode_claims(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let token = make_token(json!({ "sub": "user-1" }));
        assert!(decode_claims(&token).is_ok());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(decode_claims("not-a-jwt").is_err());
        assert!(decode_claims("a.b").is_err());
        assert!(decode_claims("a.!!!not-base64!!!.c").is_err());

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(decode_claims(&not_json).is_err());
    }
}
