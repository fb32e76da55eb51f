use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use usage_ingestion::{
    config::AppConfig,
    http::{self, AppState},
    metrics_server, observability,
    store::PostgresStore,
    Ingestor,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = Arc::new(PostgresStore::new(pool));

    let ingestor = Ingestor::new(
        store.clone(),
        store.clone(),
        store,
        cfg.ingestion.unresolved_meter_policy,
    );
    let app = http::router(AppState::new(ingestor), cfg.http.max_body_bytes);

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        unresolved_meter_policy = ?cfg.ingestion.unresolved_meter_policy,
        "edi usage ingestion listening"
    );

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
