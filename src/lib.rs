use crate::config::db::DB;
use crate::config::rd::RD;
use crate::config::AppConfig;
use crate::errors::{any_error, ApiError};
use crate::route::tag_api;
use crate::service::backfill_service::{SqlTagSource, TagSource};
use crate::service::cache_service::Cache;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

pub mod config;
pub mod consumer;
pub mod errors;
pub mod logging;
pub mod model;
pub mod route;
pub mod service;
pub mod util;

// Application state shared across handlers.
// Cloning AppState is cheap because every resource sits behind an Arc; the
// cache and the relational source are trait handles so tests can substitute
// alternates without rebinding globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<dyn Cache>,
    pub source: Arc<dyn TagSource>,
}

impl AppState {
    pub fn new(config: AppConfig, cache: Arc<dyn Cache>, source: Arc<dyn TagSource>) -> Self {
        AppState {
            config: Arc::new(config),
            cache,
            source,
        }
    }

    /// Connects the production handles: the cache pool and the relational
    /// pool. The `DB` is returned alongside so the caller can close it during
    /// shutdown, after the consumer loops have exited.
    pub async fn connect(config: AppConfig) -> (Self, Arc<DB>) {
        let rd = RD::new(&config.valkey.url())
            .await
            .expect("Cannot connect to cache server");

        let db = Arc::new(
            DB::new(&config.mysql.url())
                .await
                .expect("Cannot connect to database"),
        );

        let state = AppState::new(
            config,
            Arc::new(rd),
            Arc::new(SqlTagSource::new(db.pool.clone())),
        );
        (state, db)
    }
}

// Application router creation
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", tag_api::create_routes())
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_404() -> ApiError {
    any_error(404, "Not Found")
}

async fn handle_405() -> ApiError {
    any_error(405, "Method Not Allowed")
}

// Custom panic handler, logs the panic and returns a 500 response
fn handle_panic(panic: Box<dyn std::any::Any + Send>) -> Response {
    let panic_message = if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Unknown panic"
    };

    error!("App panicked: {}", panic_message);
    any_error(500, "Internal Server Error").into_response()
}
