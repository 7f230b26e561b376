/*
 * Responsibility
 * - 環境変数の読み込み (issuer / audience / JWKS endpoint / algorithm など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::auth::algorithm::TrustedAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the guard needs to trust a token.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: Url,
    pub algorithm: TrustedAlgorithm,
    pub leeway_seconds: u64,

    pub jwks_fetch_timeout: Duration,
    pub jwks_fetch_retries: u32,
    // None disables refresh-on-unknown-kid
    pub jwks_refresh_cooldown: Option<Duration>,
}

/// Limits applied to every inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub http: HttpConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(var("PORT"), "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let defaults = HttpConfig::default();
        let request_timeout = Duration::from_secs(parse_or(
            var("REQUEST_TIMEOUT_SECONDS"),
            "REQUEST_TIMEOUT_SECONDS",
            defaults.request_timeout.as_secs(),
        )?);
        let body_limit_bytes: usize = parse_or(
            var("REQUEST_BODY_LIMIT_BYTES"),
            "REQUEST_BODY_LIMIT_BYTES",
            defaults.body_limit_bytes,
        )?;
        if body_limit_bytes == 0 {
            return Err(ConfigError::Invalid("REQUEST_BODY_LIMIT_BYTES"));
        }

        let issuer = match (var("AUTH_ISSUER"), var("AUTH0_DOMAIN")) {
            (Some(issuer), _) => issuer,
            // Auth0 issuers are always `https://<domain>/`
            (None, Some(domain)) => format!("https://{}/", domain.trim_end_matches('/')),
            (None, None) => return Err(ConfigError::Missing("AUTH_ISSUER")),
        };

        let audience = var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let jwks_url = match var("AUTH_JWKS_URL") {
            Some(url) => Url::parse(&url).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URL"))?,
            None => default_jwks_url(&issuer).ok_or(ConfigError::Invalid("AUTH_ISSUER"))?,
        };

        if app_env.is_production() && jwks_url.scheme() != "https" {
            return Err(ConfigError::Invalid("AUTH_JWKS_URL"));
        }

        let algorithm = match var("AUTH_ALGORITHM") {
            Some(alg) => alg
                .parse::<TrustedAlgorithm>()
                .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?,
            None => TrustedAlgorithm::default(),
        };

        let leeway_seconds = parse_or(var("AUTH_LEEWAY_SECONDS"), "AUTH_LEEWAY_SECONDS", 0)?;

        let jwks_fetch_timeout = Duration::from_millis(parse_or(
            var("JWKS_FETCH_TIMEOUT_MS"),
            "JWKS_FETCH_TIMEOUT_MS",
            5_000,
        )?);
        if jwks_fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("JWKS_FETCH_TIMEOUT_MS"));
        }

        let jwks_fetch_retries: u32 = parse_or(var("JWKS_FETCH_RETRIES"), "JWKS_FETCH_RETRIES", 1)?;

        let cooldown_seconds: u64 = parse_or(
            var("JWKS_REFRESH_COOLDOWN_SECONDS"),
            "JWKS_REFRESH_COOLDOWN_SECONDS",
            300,
        )?;
        let jwks_refresh_cooldown =
            (cooldown_seconds > 0).then(|| Duration::from_secs(cooldown_seconds));

        // A cold key cache must answer 401 before the request timeout fires.
        let worst_fetch = jwks_fetch_timeout.saturating_mul(jwks_fetch_retries.saturating_add(1));
        if request_timeout <= worst_fetch {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            http: HttpConfig {
                request_timeout,
                body_limit_bytes,
            },
            auth: AuthConfig {
                issuer,
                audience,
                jwks_url,
                algorithm,
                leeway_seconds,
                jwks_fetch_timeout,
                jwks_fetch_retries,
                jwks_refresh_cooldown,
            },
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn default_jwks_url(issuer: &str) -> Option<Url> {
    let base = Url::parse(issuer).ok()?;
    let base = if base.path().ends_with('/') {
        base
    } else {
        Url::parse(&format!("{}/", base)).ok()?
    };
    base.join(".well-known/jwks.json").ok()
}
