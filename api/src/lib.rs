//! HTTP surface for both server roles.
//!
//! - `SERVER_ROLE=level`: `/health`, `/stats`, `/ingest`, `/query` over one index
//! - `SERVER_ROLE=router`: `/health`, `/query`, `/ingest` in front of the
//!   three level instances

use std::{env, sync::Arc};

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

pub use crate::core::app_state::{HttpConfig, LevelState, RouterState, ServerRole};
pub use error_handler::{AppError, AppResult};
pub use middleware_layer::cors::CorsPolicy;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{error, info};

use crate::{
    middleware_layer::{cors::cors, json_extractor::json_error_mapper},
    routes::{
        health::health_route::health,
        ingest::ingest_route::ingest,
        query::query_route::query,
        router::{
            router_health_route::router_health, router_ingest_route::router_ingest,
            router_query_route::router_query,
        },
        stats::stats_route::stats,
    },
};

/// Routes of a level instance.
pub fn level_app(state: Arc<LevelState>, http: &HttpConfig) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/ingest", post(ingest))
        .route("/query", post(query))
        .with_state(state);
    with_common_layers(app, http)
}

/// Routes of the level router.
pub fn router_app(state: Arc<RouterState>, http: &HttpConfig) -> Router {
    let app = Router::new()
        .route("/health", get(router_health))
        .route("/query", post(router_query))
        .route("/ingest", post(router_ingest))
        .with_state(state);
    with_common_layers(app, http)
}

fn with_common_layers(app: Router, http: &HttpConfig) -> Router {
    app.layer(DefaultBodyLimit::max(http.max_upload_bytes))
        .layer(middleware::from_fn(json_error_mapper))
        .layer(middleware::from_fn_with_state(
            Arc::new(http.cors.clone()),
            cors,
        ))
}

/// Reads the role and address from the environment, builds the state and
/// serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let role = ServerRole::from_env()?;
    let http = HttpConfig::from_env();

    let (app, router_state) = match role {
        ServerRole::Level => {
            let state = Arc::new(LevelState::from_env().await?);
            (level_app(state, &http), None)
        }
        ServerRole::Router => {
            let state = Arc::new(RouterState::from_env()?);
            (router_app(Arc::clone(&state), &http), Some(state))
        }
    };

    // Bind to address
    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, ?role, "listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    if let Some(state) = router_state {
        state.router.shutdown();
    }
    info!("server stopped");
    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
