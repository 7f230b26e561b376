/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → guard 生成 → signing key の warm-up
 * - Router 組み立て (health / ready) と axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_auth_guard;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,coffee_auth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        issuer = %config.auth.issuer,
        audience = %config.auth.audience,
        jwks = %config.auth.jwks_url,
        algorithm = %config.auth.algorithm,
        "starting in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    warm_up(&state).await;

    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let guard = build_auth_guard(&config.auth)?;
    Ok(AppState::new(guard))
}

// A cold cache is not fatal: the first request will try again.
async fn warm_up(state: &AppState) {
    match state.guard.key_resolver().key_set().await {
        Ok(keys) => tracing::info!(kids = ?keys.kids(), "signing keys loaded"),
        Err(err) => tracing::warn!(code = err.code(), "signing keys not loaded at startup"),
    }
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state);

    middleware::http::apply(router, &config.http)
}

async fn health() -> &'static str {
    "ok"
}

async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.guard.key_resolver().cached().await {
        Some(_) => (StatusCode::OK, "ready"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "signing keys not loaded"),
    }
}
