/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: セッション解決 / sign-in, sign-out の URL 組み立て
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::AuthService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}
