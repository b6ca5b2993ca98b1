/*
 * Responsibility
 * - Handler から見える「認証コンテキスト」の型
 * - session stage が解決して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - cookie の復号や refresh は middleware/services 側の責務
 * - ここは「型（契約）」として固定化し、route 追加で増える領域から切り離す
 */
use std::sync::Arc;

use crate::middleware::auth::{RequestScope, legacy::LegacyAuth};
use crate::services::auth::{Authorized, ResolvedAuth};

/// Read accessor: the resolved state, authorized or not.
///
/// Rejects with 500 when the session stage does not wrap the route.
#[derive(Debug, Clone)]
pub struct Auth(pub Arc<ResolvedAuth>);

/// Strict accessor: only signed-in callers (401 otherwise).
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Authorized);

/// The request scope itself, for handlers that take over the cookie (sign-out).
#[derive(Debug, Clone)]
pub struct CurrentScope(pub Arc<RequestScope>);

/// Loader-style compatibility entry point; redirects anonymous callers to sign in.
#[derive(Debug, Clone)]
pub struct LegacyLoader(pub LegacyAuth);

/// Action-style compatibility entry point; never redirects.
#[derive(Debug, Clone)]
pub struct LegacyAction(pub LegacyAuth);
