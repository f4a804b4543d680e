//! Gatehouse API server

use anyhow::Context;
use gatehouse_api::{create_router, state::AppState};
use gatehouse_core::{AppConfig, PgStore, Repositories};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config);

    let repos = match config.database.postgres_url.as_deref() {
        Some(url) => {
            let store = PgStore::new(url, config.database.postgres_pool_size)
                .await
                .context("failed to connect to PostgreSQL")?;
            store.migrate().await.context("failed to run migrations")?;
            tracing::info!("Connected to PostgreSQL");
            Repositories::postgres(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Repositories::in_memory().0
        }
    };

    let state = Arc::new(AppState::new(config.clone(), repos).context("invalid auth configuration")?);
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Gatehouse API listening on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "gatehouse_api={level},gatehouse_core={level},audit=info,tower_http=debug",
            level = config.logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
