//! hkpt-resolver library interface
//!
//! Waterfall resolution of Hong Kong property names (Chinese → English)
//! plus the HTTP router that exposes it. The binary in `main.rs` only wires
//! configuration, storage and the oracle together.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use services::PropertyTranslator;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolution service
    pub translator: Arc<PropertyTranslator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(translator: Arc<PropertyTranslator>) -> Self {
        Self {
            translator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .merge(api::health_routes())
        .merge(api::translate_routes())
        .merge(api::stats_routes())
        .layer(cors)
        .with_state(state)
}
