//! Factory: build `AuthGuard` from application `AuthConfig`.
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::services::auth::jwks::{FetchPolicy, HttpJwksSource, KeyResolver};
use crate::services::auth::verifier::{ClaimRules, TokenVerifier};
use crate::services::auth::AuthGuard;

pub fn build_auth_guard(config: &AuthConfig) -> Result<AuthGuard, AppError> {
    let source = HttpJwksSource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build jwks http client");
            AppError::Internal
        })?;

    let resolver = KeyResolver::new(
        Arc::new(source),
        config.algorithm,
        FetchPolicy {
            timeout: config.jwks_fetch_timeout,
            retries: config.jwks_fetch_retries,
            refresh_cooldown: config.jwks_refresh_cooldown,
        },
    );

    let verifier = TokenVerifier::new(
        Arc::new(resolver),
        ClaimRules {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_seconds: config.leeway_seconds,
        },
    );

    Ok(AuthGuard::new(verifier))
}
