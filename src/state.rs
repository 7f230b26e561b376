/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use crate::services::auth::AuthGuard;

#[derive(Clone, Debug)]
pub struct AppState {
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(guard: AuthGuard) -> Self {
        Self { guard }
    }
}
