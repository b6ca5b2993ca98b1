/*
 * Responsibility
 * - tracing 初期化 → Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (HTTP 横断 / session stage)
 * - axum::serve() で起動
 */
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware::{
        self,
        auth::{SessionStage, StageOptions},
    },
    services::auth::{ResolveOptions, build_auth_service},
    state::AppState,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,session_gate=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(?config, "config loaded");

    let auth = build_auth_service(&config)?;
    let stage = middleware::auth::register(
        auth.clone(),
        StageOptions {
            ensure_signed_in: config.ensure_signed_in,
            on_unauthenticated: config.on_unauthenticated,
            hooks: ResolveOptions::default()
                .on_refresh_success(|authorized| {
                    tracing::debug!(user_id = %authorized.user.id, "refresh success hook");
                })
                .on_refresh_error(|err| {
                    tracing::debug!(error = %err, "refresh error hook");
                }),
        },
    );
    let state = AppState::new(auth);

    let app = build_router(state, &stage);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState, stage: &SessionStage) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(&state, stage))
        .with_state(state);

    middleware::http::apply(router, REQUEST_TIMEOUT)
}
