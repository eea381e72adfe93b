//! Air Quality Forecast API Server
//!
//! Serves three-step carbon monoxide forecasts built from the latest sensor
//! readings.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use feature_engine::FeatureAssembler;
use inference_engine::ModelStore;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::json;
use std::sync::Arc;
use storage::{ForecastStore, MySqlRepository};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod pipeline;
mod routes;

pub use crate::config::{LogFormat, Settings};
pub use error::ApiError;
pub use pipeline::{ForecastOutcome, PipelineError};
pub use routes::predict::{ForecastData, PredictionResponse};

/// Application state shared across handlers. Built once at startup and
/// never mutated afterwards.
pub struct AppState<S> {
    /// Reading and forecast storage
    pub store: S,
    /// Loaded model bundles
    pub models: Arc<ModelStore>,
    /// Feature layout the models were trained on
    pub assembler: FeatureAssembler,
    /// Prometheus exposition, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl<S: ForecastStore> AppState<S> {
    /// Create new application state
    pub fn new(store: S, models: Arc<ModelStore>) -> Self {
        Self {
            store,
            models,
            assembler: FeatureAssembler::default(),
            metrics: None,
        }
    }

    /// Replace the feature assembler
    pub fn with_assembler(mut self, assembler: FeatureAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Expose metrics through `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router<S: ForecastStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/predict/", get(routes::predict::create_prediction::<S>))
        .route("/predict", get(routes::predict::create_prediction::<S>))
        .route("/metrics", get(metrics_handler::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness handler
async fn root_handler() -> impl IntoResponse {
    Json(json!({ "status": "API Online", "mode": "GET" }))
}

/// Prometheus text exposition
async fn metrics_handler<S: ForecastStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Load models, connect to the database and serve until interrupted.
///
/// Any configuration, model or database failure aborts before the listener
/// is bound.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let database = settings.database().context("invalid database configuration")?;
    let tables = settings.tables();

    let models = ModelStore::load(&settings.models_dir)
        .with_context(|| format!("failed to load models from {}", settings.models_dir.display()))?;

    let store = MySqlRepository::connect(&database, &tables)
        .await
        .context("failed to connect to database")?;

    let state = AppState::new(store.clone(), Arc::new(models)).with_metrics(init_metrics()?);
    let app = create_router(Arc::new(state));

    info!("Starting API server on {}", settings.server_addr);
    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
