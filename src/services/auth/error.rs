use axum::http::StatusCode;
use thiserror::Error;

/// Every way the guard can refuse a request.
///
/// All variants map to `401 Unauthorized` at the boundary. The variants stay
/// distinct so logs and retry policy can tell an unreachable key service from
/// a token that references a key we have never seen, and a provider that
/// never configured permissions from a caller who lacks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingHeader,
    #[error("authorization header is malformed")]
    MalformedHeader,
    #[error("bearer token is missing")]
    MissingToken,
    #[error("token header is invalid")]
    InvalidHeader,
    #[error("token algorithm is not accepted")]
    UnsupportedAlgorithm,
    #[error("signing key not found")]
    KeyNotFound,
    #[error("signing key service unavailable")]
    KeyServiceUnavailable,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
    #[error("token claims are invalid")]
    InvalidClaims,
    #[error("permissions not included in token")]
    PermissionsNotConfigured,
    #[error("permission denied")]
    PermissionDenied,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Stable machine-checkable label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "authorization_header_missing",
            Self::MalformedHeader => "invalid_header",
            Self::MissingToken => "token_missing",
            Self::InvalidHeader => "invalid_token_header",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::KeyNotFound => "key_not_found",
            Self::KeyServiceUnavailable => "key_service_unavailable",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::PermissionsNotConfigured => "permissions_not_configured",
            Self::PermissionDenied => "permission_denied",
        }
    }

    /// Human readable text safe to return to the caller.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingHeader => "Authorization header is expected.",
            Self::MalformedHeader => "Authorization header must be of the form 'Bearer <token>'.",
            Self::MissingToken => "Bearer token not found.",
            Self::InvalidHeader => "Unable to parse token header.",
            Self::UnsupportedAlgorithm => "Token signing algorithm is not accepted.",
            Self::KeyNotFound => "Unable to find the appropriate key.",
            Self::KeyServiceUnavailable => "Signing keys are temporarily unavailable.",
            Self::InvalidSignature => "Token signature could not be verified.",
            Self::TokenExpired => "Token expired.",
            Self::InvalidClaims => "Incorrect claims. Please check the audience and issuer.",
            Self::PermissionsNotConfigured => "Permissions not included in token.",
            Self::PermissionDenied => "Permission not found.",
        }
    }

    /// Only an unreachable key service may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::KeyServiceUnavailable)
    }
}
