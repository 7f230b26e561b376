use std::sync::Arc;

use axum::http::HeaderMap;

use crate::services::auth::bearer::{bearer_from_headers, extract_bearer};
use crate::services::auth::claims::Claims;
use crate::services::auth::error::AuthError;
use crate::services::auth::jwks::KeyResolver;
use crate::services::auth::permissions::authorize;
use crate::services::auth::verifier::TokenVerifier;

/// Request-authorization guard.
///
/// Protected operations call [`AuthGuard::requires_auth`] (or the header-map
/// variant) first thing, passing the permission they need, and only continue
/// with the returned claims.
///
/// Cheap to clone; the key cache inside is shared.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    verifier: Arc<TokenVerifier>,
}

impl AuthGuard {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn key_resolver(&self) -> &KeyResolver {
        self.verifier.resolver()
    }

    /// Authenticate the raw `Authorization` header value and require
    /// `permission`.
    pub async fn requires_auth(
        &self,
        authorization: Option<&str>,
        permission: &str,
    ) -> Result<Claims, AuthError> {
        let outcome = self.check(extract_bearer(authorization), permission).await;
        log_outcome(&outcome, permission);
        outcome
    }

    pub async fn requires_auth_from_headers(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> Result<Claims, AuthError> {
        let outcome = self.check(bearer_from_headers(headers), permission).await;
        log_outcome(&outcome, permission);
        outcome
    }

    async fn check(
        &self,
        token: Result<&str, AuthError>,
        permission: &str,
    ) -> Result<Claims, AuthError> {
        let claims = self.verifier.verify(token?).await?;
        authorize(claims, permission)
    }
}

fn log_outcome(outcome: &Result<Claims, AuthError>, permission: &str) {
    match outcome {
        Ok(claims) => tracing::debug!(sub = %claims.sub, permission, "request authorized"),
        Err(err) if err.is_transient() => {
            tracing::error!(code = err.code(), permission, "authorization unavailable")
        }
        Err(err) => tracing::warn!(code = err.code(), permission, "request denied"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::algorithm::TrustedAlgorithm;
    use crate::services::auth::jwks::FetchPolicy;
    use crate::services::auth::test_support::{
        AUDIENCE, CountingSource, ISSUER, Signer, jwks, now, primary_jwk, sign, sign_with,
        valid_claims,
    };
    use crate::services::auth::verifier::ClaimRules;
    use axum::http::{HeaderValue, header};
    use serde_json::json;

    fn guard(source: Arc<CountingSource>) -> AuthGuard {
        let resolver = KeyResolver::new(source, TrustedAlgorithm::default(), FetchPolicy::default());
        AuthGuard::new(TokenVerifier::new(
            Arc::new(resolver),
            ClaimRules {
                issuer: ISSUER.to_string(),
                audience: AUDIENCE.to_string(),
                leeway_seconds: 0,
            },
        ))
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn grants_with_the_required_permission() {
        let guard = guard(CountingSource::serving(jwks(vec![primary_jwk()])));
        let body = valid_claims(&["get:drinks-detail", "post:drinks"]);
        let header = bearer(&sign(&body));

        let claims = guard
            .requires_auth(Some(&header), "post:drinks")
            .await
            .unwrap();

        assert_eq!(serde_json::to_value(&claims).unwrap(), body);
    }

    #[tokio::test]
    async fn header_failures_never_reach_the_key_service() {
        let source = CountingSource::serving(jwks(vec![primary_jwk()]));
        let guard = guard(source.clone());

        assert_eq!(
            guard.requires_auth(None, "post:drinks").await,
            Err(AuthError::MissingHeader)
        );
        assert_eq!(
            guard.requires_auth(Some("Bearer"), "post:drinks").await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            guard.requires_auth(Some("Token abc"), "post:drinks").await,
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn permission_checks_run_after_verification() {
        let guard = guard(CountingSource::serving(jwks(vec![primary_jwk()])));

        let header = bearer(&sign(&valid_claims(&["get:drinks-detail"])));
        assert_eq!(
            guard.requires_auth(Some(&header), "delete:drinks").await,
            Err(AuthError::PermissionDenied)
        );

        let mut body = valid_claims(&[]);
        body.as_object_mut().unwrap().remove("permissions");
        let header = bearer(&sign(&body));
        assert_eq!(
            guard.requires_auth(Some(&header), "delete:drinks").await,
            Err(AuthError::PermissionsNotConfigured)
        );
    }

    #[tokio::test]
    async fn expired_token_fails_even_with_the_permission() {
        let guard = guard(CountingSource::serving(jwks(vec![primary_jwk()])));
        let mut body = valid_claims(&["delete:drinks"]);
        body["exp"] = json!(now() - 5);

        let header = bearer(&sign(&body));
        assert_eq!(
            guard.requires_auth(Some(&header), "delete:drinks").await,
            Err(AuthError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn reads_the_authorization_header() {
        let guard = guard(CountingSource::serving(jwks(vec![primary_jwk()])));
        let token = sign_with(Signer::Primary, Some("unknown"), &valid_claims(&["patch:drinks"]));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&bearer(&token)).unwrap(),
        );

        assert_eq!(
            guard.requires_auth_from_headers(&headers, "patch:drinks").await,
            Err(AuthError::KeyNotFound)
        );
    }
}
