//! Shared fixtures for the auth unit tests: two RSA signing keys, JWKs for
//! them, a token builder and an in-memory key source that counts fetches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::services::auth::jwks::{JwksDocument, JwksSource, KeyFetchError};

pub const PRIMARY_KID: &str = "primary";
pub const ROTATED_KID: &str = "rotated";
pub const ISSUER: &str = "https://coffee.example.auth0.com/";
pub const AUDIENCE: &str = "drinks";

const PRIMARY_PEM: &str = include_str!("../../../tests/fixtures/rsa_primary.pem");
const PRIMARY_N: &str = include_str!("../../../tests/fixtures/rsa_primary.n");
const ROTATED_PEM: &str = include_str!("../../../tests/fixtures/rsa_rotated.pem");
const ROTATED_N: &str = include_str!("../../../tests/fixtures/rsa_rotated.n");

fn jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": n.trim(),
        "e": "AQAB",
    })
}

pub fn primary_jwk() -> Value {
    jwk(PRIMARY_KID, PRIMARY_N)
}

pub fn rotated_jwk() -> Value {
    jwk(ROTATED_KID, ROTATED_N)
}

pub fn jwks(keys: Vec<Value>) -> JwksDocument {
    JwksDocument { keys }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims for a token that passes every check for `permissions`.
pub fn valid_claims(permissions: &[&str]) -> Value {
    json!({
        "iss": ISSUER,
        "aud": [AUDIENCE, "https://coffee.example.auth0.com/userinfo"],
        "sub": "auth0|barista",
        "iat": now() - 10,
        "exp": now() + 3600,
        "azp": "spa-client",
        "scope": "openid profile email",
        "permissions": permissions,
    })
}

/// RS256 token signed by the primary key (or the rotated key's PEM when
/// `signer` says so) carrying `kid`.
pub fn sign_with(signer: Signer, kid: Option<&str>, claims: &Value) -> String {
    let pem = match signer {
        Signer::Primary => PRIMARY_PEM,
        Signer::Rotated => ROTATED_PEM,
    };
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();

    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);

    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(Signer::Primary, Some(PRIMARY_KID), claims)
}

#[derive(Debug, Clone, Copy)]
pub enum Signer {
    Primary,
    Rotated,
}

/// Key source double. Serves whatever document is queued, counts calls, and
/// can be slowed down or made to fail.
pub struct CountingSource {
    document: Mutex<Result<JwksDocument, KeyFetchError>>,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn serving(document: JwksDocument) -> Arc<Self> {
        Self::build(Ok(document), Duration::ZERO)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(Err(KeyFetchError::Status(503)), Duration::ZERO)
    }

    pub fn slow(document: JwksDocument, delay: Duration) -> Arc<Self> {
        Self::build(Ok(document), delay)
    }

    fn build(document: Result<JwksDocument, KeyFetchError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            document: Mutex::new(document),
            delay_ms: AtomicU64::new(delay.as_millis() as u64),
            calls: AtomicUsize::new(0),
        })
    }

    pub async fn serve(&self, document: JwksDocument) {
        *self.document.lock().await = Ok(document);
    }

    pub async fn fail(&self) {
        *self.document.lock().await = Err(KeyFetchError::Transport("connection refused".into()));
    }

    /// Make every later fetch take `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwksSource for CountingSource {
    fn endpoint(&self) -> &str {
        "memory://jwks"
    }

    async fn fetch(&self) -> Result<JwksDocument, KeyFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.document.lock().await.clone()
    }
}
