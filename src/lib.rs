//! Exoplanet Prediction API
//!
//! Serves a pre-trained planet/not-planet classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     EXOPLANET API                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────────┐   ┌────────────────┐  │
//! │  │  Handlers  │──▶│ Feature Resolver │──▶│   Inference    │  │
//! │  │  (Axum)    │   │ (schema, median) │   │   Engine       │  │
//! │  └─────┬──────┘   └────────┬─────────┘   └───────┬────────┘  │
//! │        │                   │                     │           │
//! │        │            ┌──────▼──────┐      ┌───────▼────────┐  │
//! │        │            │ lookup CSV  │      │ Model Artifact │  │
//! │        │            │ (per req.)  │      │ (Arc, startup) │  │
//! │        │            └─────────────┘      └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use config::Config;
use logic::model::ModelArtifact;

/// Shared application state
///
/// Built once at startup; never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelArtifact>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(model: ModelArtifact, config: Config) -> Self {
        Self {
            model: Arc::new(model),
            config: Arc::new(config),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(handlers::info::root))
        .route("/health", get(handlers::health::check))
        .route("/features", get(handlers::info::features))
        .route(
            "/predict",
            get(handlers::info::predict_usage).post(handlers::predict::predict),
        )
        .route("/predict-csv", post(handlers::batch::predict_csv))
        .layer(body_limit)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Credentials are allowed, so methods and headers mirror the request
/// instead of using wildcards.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
