mod auth;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod routes;
mod services;
mod store;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    models::{AppState, DashboardSettings},
    services::{
        assist::{RewriteClient, TextRewriter},
        documents::{CloudStorage, CloudSyncClient},
    },
    store::postgres::PgStore,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

const FUNCTION_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;

    let cloud: Option<Arc<dyn CloudStorage>> = match &cfg.document_sync_url {
        Some(url) => Some(Arc::new(CloudSyncClient::new(
            url,
            cfg.functions_api_key.clone(),
            FUNCTION_TIMEOUT,
        )?)),
        None => {
            tracing::warn!("DOCUMENT_SYNC_URL not set; document upload is disabled");
            None
        }
    };
    let rewriter: Option<Arc<dyn TextRewriter>> = match &cfg.text_rewrite_url {
        Some(url) => Some(Arc::new(RewriteClient::new(
            url,
            cfg.functions_api_key.clone(),
            FUNCTION_TIMEOUT,
        )?)),
        None => {
            tracing::warn!("TEXT_REWRITE_URL not set; text rewriting is disabled");
            None
        }
    };

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        cloud,
        rewriter,
        settings: DashboardSettings {
            completed_limit: cfg.completed_limit,
            require_completion_notes: cfg.require_completion_notes,
            practice_offset: cfg.practice_offset,
        },
    };

    // Browser clients call the API cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
