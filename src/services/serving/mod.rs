use crate::config::{Config, ModelSource};
use crate::error::{RecommenderError, Result};
use crate::models::*;
use crate::services::{recommendation::RecommendationService, training::TrainingService};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Where the request path gets its model from.
#[derive(Debug, Clone)]
enum Backend {
    Loaded(RecommendationService),
    Retrain(Arc<Config>),
}

/// Resolves a recommender per request and runs CPU-bound work off the async
/// executor.
#[derive(Debug, Clone)]
pub struct ServingService {
    backend: Backend,
}

impl ServingService {
    /// Serves from an already trained artifact.
    pub fn from_artifact(artifact: Arc<ModelArtifact>, config: &Config) -> Self {
        Self {
            backend: Backend::Loaded(RecommendationService::new(artifact, config.recommendation.clone())),
        }
    }

    /// Builds the backend selected by `serving.model_source`.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        match config.serving.model_source {
            ModelSource::Artifact => {
                let artifact = ModelArtifact::load(&config.data.model_path)?;
                Ok(Self::from_artifact(Arc::new(artifact), &config))
            }
            ModelSource::Retrain => {
                info!(
                    "Serving in retrain mode: refitting from {} on every request",
                    config.data.cache_path.display()
                );
                Ok(Self {
                    backend: Backend::Retrain(config),
                })
            }
        }
    }

    pub fn model_source(&self) -> ModelSource {
        match self.backend {
            Backend::Loaded(_) => ModelSource::Artifact,
            Backend::Retrain(_) => ModelSource::Retrain,
        }
    }

    fn resolve(&self) -> Result<RecommendationService> {
        match &self.backend {
            Backend::Loaded(service) => Ok(service.clone()),
            Backend::Retrain(config) => {
                let artifact = TrainingService::new(&config.training).train_from_cache(&config.data.cache_path)?;
                Ok(RecommendationService::new(Arc::new(artifact), config.recommendation.clone()))
            }
        }
    }

    pub fn recommend_blocking(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let started = Instant::now();
        let response = self.resolve()?.recommend(request)?;
        info!(
            "Served {} recommendations in {}ms",
            response.recommendations.len(),
            started.elapsed().as_millis()
        );
        Ok(response)
    }

    pub async fn recommend(&self, request: RecommendationRequest) -> Result<RecommendationResponse> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.recommend_blocking(&request))
            .await
            .map_err(|e| RecommenderError::Internal(format!("recommendation task failed: {}", e)))?
    }
}
