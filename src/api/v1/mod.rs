/*
 * Responsibility
 * - v1 の公開ポイント (extractors の re-export など)
 * - drinks の CRUD handler はこの crate の外側 (guard を呼ぶ側) に置く
 */
pub mod extractors;
