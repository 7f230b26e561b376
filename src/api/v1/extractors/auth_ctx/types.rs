/*
 * Responsibility
 * - Handler から見える「認可済みコンテキスト」の型
 * - middleware が guard を通して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT の検証や permission チェックは services/auth 側の責務
 * - ここは「型（契約）」として固定化する
 */

use crate::services::auth::Claims;

/// 認可済みのリクエストに付与されるコンテキスト
///
/// - `sub` は identity provider 側の subject (ex: `auth0|...`)
/// - `permission` はこのリクエストを通した permission
/// - `claims` は検証済み claims そのもの（リクエスト単位、キャッシュしない）
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub sub: String,
    pub permission: &'static str,
    pub claims: Claims,
}

impl AuthCtx {
    pub fn new(claims: Claims, permission: &'static str) -> Self {
        Self {
            sub: claims.sub.clone(),
            permission,
            claims,
        }
    }
}
