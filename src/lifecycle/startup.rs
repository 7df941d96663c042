//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the application (routes, hooks, engines)
//! - Start metrics, bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app;
use crate::config::{load_config, validate_config, AppConfig, ConfigError};
use crate::dispatch::Application;
use crate::error::RouteError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::resource::{MemoryStore, Page, ResourceStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration from `path` (defaults when absent), with an optional
/// bind address override applied before validation.
pub fn load(path: Option<&Path>, bind_address: Option<String>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind_address) = bind_address {
        config.listener.bind_address = bind_address;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Store with a starter page so a fresh server has something to show.
pub fn seed_store() -> MemoryStore {
    MemoryStore::with_pages([Page::new(
        "Home",
        "Welcome to the wiki.\n\nPOST a `content` field to any path to create a page.",
    )])
}

pub fn build_application(config: &AppConfig, store: Arc<dyn ResourceStore>) -> Result<Application, RouteError> {
    let builder = app::builder(store, &config.site.title, &config.routing.patterns)?;
    Ok(builder.build())
}

/// Serve `app` until a termination signal arrives.
pub async fn run(config: AppConfig, app: Arc<Application>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        max_body_size = config.listener.max_body_size,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(app, &config.listener).run(listener, receiver).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
