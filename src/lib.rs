pub mod algorithms;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{Config, DEFAULT_FILL_RATING};
pub use error::{RecommenderError, Result};
pub use models::*;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub serving: Arc<services::serving::ServingService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let serving = Arc::new(services::serving::ServingService::from_config(config.clone())?);

        Ok(Self { config, serving })
    }

    /// State around an artifact that is already in memory.
    pub fn with_artifact(config: Config, artifact: Arc<ModelArtifact>) -> Self {
        let serving = Arc::new(services::serving::ServingService::from_artifact(artifact, &config));
        Self {
            config: Arc::new(config),
            serving,
        }
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
