use std::sync::Arc;

use crate::services::auth::algorithm::TrustedAlgorithm;
use serde::Deserialize;

use crate::services::auth::claims::{Claims, Expiry};
use crate::services::auth::error::AuthError;
use crate::services::auth::jwks::KeyResolver;
use crate::services::auth::token::RawToken;

/// What a token must say about itself to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRules {
    pub issuer: String,
    pub audience: String,
    /// Clock-skew allowance applied to `exp` and `nbf`.
    pub leeway_seconds: u64,
}

/// Access-token verifier for provider-issued asymmetric JWTs.
///
/// Order of checks:
/// - header shape, then the algorithm, before any key lookup
/// - signature with the resolved key
/// - `exp`, `nbf`, `aud`, `iss` on the decoded payload; `exp` is read on its
///   own first so an expired token reports expiry even if other claims are
///   malformed
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    resolver: Arc<KeyResolver>,
    rules: ClaimRules,
}

impl TokenVerifier {
    pub fn new(resolver: Arc<KeyResolver>, rules: ClaimRules) -> Self {
        Self { resolver, rules }
    }

    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify `token` as of the unix timestamp `now`.
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let raw = RawToken::split(token)?;
        let header = raw.header()?;

        let algorithm = self.resolver.algorithm();
        if !algorithm.matches(&header.alg) {
            tracing::debug!(alg = %header.alg, expected = %algorithm, "rejecting token algorithm");
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::InvalidHeader)?;

        let key = self.resolver.resolve(kid).await?;

        verify_signature(&raw, &key, algorithm)?;

        let payload: serde_json::Value = raw.payload()?;
        if let Ok(expiry) = Expiry::deserialize(&payload) {
            self.check_expiry(expiry.exp, now)?;
        }

        let claims = Claims::deserialize(&payload).map_err(|err| {
            tracing::debug!(error = %err, "token payload does not match claims");
            AuthError::InvalidClaims
        })?;
        self.check_claims(&claims, now)?;

        Ok(claims)
    }

    fn leeway(&self) -> i64 {
        i64::try_from(self.rules.leeway_seconds).unwrap_or(i64::MAX)
    }

    fn check_expiry(&self, exp: i64, now: i64) -> Result<(), AuthError> {
        if now >= exp.saturating_add(self.leeway()) {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }

    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        let leeway = self.leeway();

        self.check_expiry(claims.exp, now)?;

        if let Some(nbf) = claims.nbf {
            if nbf > now.saturating_add(leeway) {
                tracing::debug!(nbf, now, "token not yet valid");
                return Err(AuthError::InvalidClaims);
            }
        }

        if !claims.aud.contains(&self.rules.audience) {
            tracing::debug!(aud = ?claims.aud, "token audience mismatch");
            return Err(AuthError::InvalidClaims);
        }

        if claims.iss != self.rules.issuer {
            tracing::debug!(iss = %claims.iss, "token issuer mismatch");
            return Err(AuthError::InvalidClaims);
        }

        Ok(())
    }
}

fn verify_signature(
    raw: &RawToken<'_>,
    key: &jsonwebtoken::DecodingKey,
    algorithm: TrustedAlgorithm,
) -> Result<(), AuthError> {
    match jsonwebtoken::crypto::verify(
        raw.signature(),
        raw.signing_input().as_bytes(),
        key,
        algorithm.algorithm(),
    ) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidSignature),
        Err(err) => {
            tracing::debug!(error = %err, "signature check errored");
            Err(AuthError::InvalidSignature)
        }
    }
}
