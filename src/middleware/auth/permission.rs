//! bearer token 検証 + permission チェック → AuthCtx を extensions に入れる
//!
//! - 各 route が必要とする permission を明示的に渡す (`"post:drinks"` など)
//! - 失敗は AppError::Auth として返し、handler には到達させない
//! - handler 内で guard を直接呼ぶ場合は `AuthGuard::requires_auth_from_headers` を使う

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

/// `router` の全 route に `permission` を要求する。
///
/// 例：
/// ```ignore
/// let create = Router::new().route("/drinks", post(create_drink));
/// let create = middleware::auth::permission::require(create, state.clone(), "post:drinks");
/// app = app.merge(create);
/// ```
pub fn require(
    router: Router<AppState>,
    state: AppState,
    permission: &'static str,
) -> Router<AppState> {
    // route_layer: マッチしなかった request (404/405) には guard を掛けない
    router.route_layer(middleware::from_fn_with_state(
        state,
        move |State(state): State<AppState>, req: Request<Body>, next: Next| {
            permission_middleware(state, permission, req, next)
        },
    ))
}

async fn permission_middleware(
    state: AppState,
    permission: &'static str,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = state
        .guard
        .requires_auth_from_headers(req.headers(), permission)
        .await?;

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::new(claims, permission));

    Ok(next.run(req).await)
}
