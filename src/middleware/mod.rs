/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - http: request-id / trace / timeout, auth: session stage と access gate
 */
pub mod auth;
pub mod http;
