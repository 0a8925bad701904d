pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use anyhow::Context;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::evaluation::EvaluationClient;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("Failed to connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("Failed to apply migrations")?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; auth rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let evaluator = EvaluationClient::from_settings(&settings)?;
    let state = AppState::new(settings, db_pool, redis.clone(), evaluator);

    if let Err(err) = core::bootstrap::ensure_default_skills(&state).await {
        tracing::error!(error = %err, "Failed to seed default skills");
    }
    if let Err(err) = core::bootstrap::prune_expired_refresh_tokens(&state).await {
        tracing::warn!(error = %err, "Failed to prune expired refresh tokens");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr())
        .await
        .with_context(|| format!("Failed to bind {}", state.settings().server_addr()))?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        model = %state.evaluator().model(),
        "Skillcheck API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
