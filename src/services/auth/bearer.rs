//! `Authorization: Bearer <token>` extraction.
//!
//! Only the header *format* is checked here. The token itself is handed back
//! untouched; nothing inside it is trusted until the verifier has checked the
//! signature.

use axum::http::{HeaderMap, header};

use crate::services::auth::error::AuthError;

/// Pull the bearer credential out of a raw `Authorization` header value.
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization.ok_or(AuthError::MissingHeader)?;

    let mut parts = value.split_whitespace();

    let scheme = parts.next().ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = parts.next().ok_or(AuthError::MissingToken)?;

    // `Bearer a b` is not a credential we understand.
    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Same as [`extract_bearer`], reading the header from a request.
///
/// A header that is present but not visible ASCII is treated as malformed.
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingHeader);
    };

    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    extract_bearer(Some(value))
}
