//! Authentication helpers: an opaque `X-User-ID` header for the
//! chat surface, and an HS256 bearer token carrying an `admin` role
//! claim for the re-index endpoint.

use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ApiError;

/// The chat surface treats this as an opaque tag, never validated —
/// sessions are merely scoped by it, not authorized against it.
pub fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct AdminClaims {
    role: String,
    #[allow(dead_code)]
    exp: Option<u64>,
}

/// Verify the `Authorization: Bearer <token>` header carries an HS256
/// token, signed with `admin_secret`, whose payload claims `role: admin`
///. Token validation itself is delegated to `jsonwebtoken`.
pub fn verify_admin_token(headers: &HeaderMap, admin_secret: &str) -> Result<(), ApiError> {
    let header_value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer scheme"))?;

    let key = DecodingKey::from_secret(admin_secret.as_bytes());
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = false;

    let data = decode::<AdminClaims>(token, &key, &validation)
        .map_err(|e| ApiError::unauthorized(format!("invalid admin token: {e}")))?;

    if data.claims.role != "admin" {
        return Err(ApiError::unauthorized("token does not carry the admin role"));
    }

    Ok(())
}
