#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use coffee_auth::config::Config;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const KID: &str = "primary";
pub const AUDIENCE: &str = "drinks";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

const PEM: &str = include_str!("../fixtures/rsa_primary.pem");
const MODULUS: &str = include_str!("../fixtures/rsa_primary.n");

pub fn issuer(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

pub fn config(server: &MockServer) -> Config {
    let issuer = issuer(server);
    let jwks = format!("{}{}", server.uri(), JWKS_PATH);

    Config::from_lookup(|key| match key {
        "AUTH_ISSUER" => Some(issuer.clone()),
        "AUTH_AUDIENCE" => Some(AUDIENCE.to_string()),
        "AUTH_JWKS_URL" => Some(jwks.clone()),
        "JWKS_FETCH_TIMEOUT_MS" => Some("2000".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn jwks() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": KID,
            "use": "sig",
            "alg": "RS256",
            "n": MODULUS.trim(),
            "e": "AQAB",
        }]
    })
}

pub async fn serve_jwks(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn token(server: &MockServer, permissions: Option<&[&str]>) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": issuer(server),
        "aud": [AUDIENCE],
        "sub": "auth0|manager",
        "iat": now,
        "exp": now + 600,
    });
    if let Some(permissions) = permissions {
        claims["permissions"] = json!(permissions);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());

    let key = EncodingKey::from_rsa_pem(PEM.as_bytes()).expect("fixture key");
    jsonwebtoken::encode(&header, &claims, &key).expect("sign")
}

pub fn request(method: &str, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn json_body(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}
