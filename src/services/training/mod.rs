use crate::algorithms::{LatentFactorModel, Nmf};
use crate::config::{DataConfig, TrainingConfig};
use crate::error::{RecommenderError, Result};
use crate::models::*;
use crate::services::matrix;
use crate::utils::metrics::ReconstructionMetrics;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Fits the factorization and packages (R, P, Q, model).
#[derive(Debug, Clone)]
pub struct TrainingService {
    solver: Nmf,
    fill_rating: f64,
    max_reconstruction_error: Option<f64>,
}

impl TrainingService {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            solver: Nmf::from(config),
            fill_rating: config.fill_rating,
            max_reconstruction_error: config.max_reconstruction_error,
        }
    }

    pub fn solver(&self) -> &Nmf {
        &self.solver
    }

    pub fn train(&self, rows: &[JoinedRating]) -> Result<ModelArtifact> {
        let started = Instant::now();
        let ratings = RatingsMatrix::pivot(rows, self.fill_rating)?;
        let (n_users, n_titles) = ratings.shape();
        info!(
            "Training NMF on {} users x {} titles ({} components, max_iter={}, l1_ratio={})",
            n_users, n_titles, self.solver.n_components, self.solver.max_iter, self.solver.l1_ratio
        );

        if self.solver.n_components > n_users.min(n_titles) {
            warn!(
                "n_components={} exceeds the matrix rank bound {}",
                self.solver.n_components,
                n_users.min(n_titles)
            );
        }

        let (model, _) = self.solver.fit(ratings.values.view())?;

        let item_features = ItemFeatures {
            titles: ratings.titles.clone(),
            values: model.components().to_owned(),
        };
        let user_features = UserFeatures {
            user_ids: ratings.user_ids.clone(),
            values: model.transform(ratings.values.view())?,
        };

        let predicted = user_features.values.dot(&item_features.values);
        let metrics = ReconstructionMetrics::compute(ratings.values.view(), predicted.view())
            .ok_or_else(|| RecommenderError::Internal("reconstruction shape mismatch".to_string()))?;
        info!(
            "Reconstruction error {:.4} (rmse {:.4}, max {:.4}) after {} iterations in {:?}",
            metrics.frobenius_error,
            metrics.rmse,
            metrics.max_abs_error,
            model.n_iter,
            started.elapsed()
        );

        if let Some(limit) = self.max_reconstruction_error {
            if metrics.frobenius_error > limit {
                return Err(RecommenderError::Training(format!(
                    "reconstruction error {:.4} exceeds limit {:.4}",
                    metrics.frobenius_error, limit
                )));
            }
        }

        Ok(ModelArtifact {
            ratings,
            user_features,
            item_features,
            model,
            trained_at: Utc::now(),
        })
    }

    /// Trains from the cached joined table.
    pub fn train_from_cache(&self, cache_path: impl AsRef<Path>) -> Result<ModelArtifact> {
        let rows = matrix::read_joined_csv(cache_path)?;
        self.train(&rows)
    }

    /// Full offline pipeline: join the source CSVs, refresh the cache, train,
    /// persist.
    pub fn run_pipeline(&self, data: &DataConfig) -> Result<ModelArtifact> {
        let rows = matrix::create_user_item_table(&data.ratings_path, &data.movies_path, data.max_rows)?;
        matrix::write_joined_csv(&data.cache_path, &rows)?;

        let artifact = self.train(&rows)?;
        artifact.save(&data.model_path)?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_components: 2,
            max_iter: 500,
            ..Config::default().training
        }
    }

    fn rows() -> Vec<JoinedRating> {
        [
            (1, "Heat", 5.0),
            (1, "Casino", 4.0),
            (2, "Toy Story", 5.0),
            (2, "Clueless", 4.5),
            (3, "Heat", 4.0),
            (3, "Se7en", 5.0),
        ]
        .into_iter()
        .map(|(user_id, title, rating)| JoinedRating {
            user_id,
            title: title.to_string(),
            rating,
        })
        .collect()
    }

    #[test]
    fn test_train_shapes() {
        let artifact = TrainingService::new(&small_config()).train(&rows()).unwrap();

        assert_eq!(artifact.ratings.shape(), (3, 5));
        assert_eq!(artifact.user_features.values.dim(), (3, 2));
        assert_eq!(artifact.item_features.values.dim(), (2, 5));
        assert_eq!(artifact.item_features.titles, artifact.ratings.titles);
        assert_eq!(artifact.user_features.user_ids, artifact.ratings.user_ids);
        assert!(artifact.model.reconstruction_err.is_finite());
    }

    #[test]
    fn test_train_fills_missing_with_default() {
        let artifact = TrainingService::new(&small_config()).train(&rows()).unwrap();
        let titles = artifact.ratings.title_index();
        let user_2 = artifact.ratings.user_ids.iter().position(|&u| u == 2).unwrap();

        assert_eq!(artifact.ratings.values[[user_2, titles["Heat"]]], 2.5);
        assert_eq!(artifact.ratings.values[[user_2, titles["Clueless"]]], 4.5);
    }

    #[test]
    fn test_quality_gate_rejects_poor_fit() {
        let config = TrainingConfig {
            max_reconstruction_error: Some(0.0),
            n_components: 1,
            max_iter: 10,
            ..small_config()
        };
        let err = TrainingService::new(&config).train(&rows()).unwrap_err();
        assert!(matches!(err, RecommenderError::Training(_)));
    }
}
