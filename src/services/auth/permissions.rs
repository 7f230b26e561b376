use crate::services::auth::claims::Claims;
use crate::services::auth::error::AuthError;

/// Grant `required` if the verified claims carry it; hand the claims back on
/// success.
///
/// Exact string membership only, no wildcards or prefixes.
pub fn authorize(claims: Claims, required: &str) -> Result<Claims, AuthError> {
    let Some(granted) = claims.permissions() else {
        return Err(AuthError::PermissionsNotConfigured);
    };

    if !granted.iter().any(|p| p == required) {
        return Err(AuthError::PermissionDenied);
    }

    Ok(claims)
}
