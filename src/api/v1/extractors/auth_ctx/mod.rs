/*!
 * Authentication context extractors
 *
 * Responsibility:
 * - session stage が解決した認証状態を handler に提供する
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - Auth / RequireAuth / CurrentScope
 * - LegacyLoader / LegacyAction
 */

mod core;
mod types;

pub use types::{Auth, CurrentScope, LegacyAction, LegacyLoader, RequireAuth};
