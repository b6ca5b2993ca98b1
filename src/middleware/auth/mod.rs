/*
 * Responsibility
 * - session stage (解決 → handler 実行 → cookie commit)
 * - route 単位の access gate
 * - legacy (loader / action) 互換入口: stage の有無を自動判定
 * - request scope (1 リクエスト 1 回の解決結果キャッシュ) と accessor
 */
pub mod access;
pub mod legacy;
pub mod scope;
pub mod session;

pub use access::{AccessPolicy, OnUnauthenticated};
pub use scope::{RequestScope, current_auth, get_auth, require_auth, scope_of};
pub use session::{SessionStage, StageOptions, register};
