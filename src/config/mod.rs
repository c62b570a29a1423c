use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Rating assigned to every (user, title) cell with no observed rating, both
/// when pivoting the training matrix and when building a new-user profile.
pub const DEFAULT_FILL_RATING: f64 = 2.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
    pub serving: ServingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub ratings_path: PathBuf,
    pub movies_path: PathBuf,
    /// Upper bound on rating rows read from `ratings_path`.
    pub max_rows: usize,
    /// Joined (user, title, rating) table cached between builder and trainer.
    pub cache_path: PathBuf,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub n_components: usize,
    pub max_iter: usize,
    pub l1_ratio: f64,
    pub alpha: f64,
    pub tol: f64,
    pub seed: u64,
    pub fill_rating: f64,
    /// Fail training when the Frobenius reconstruction error exceeds this.
    pub max_reconstruction_error: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTitlePolicy {
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub top_k: usize,
    pub fill_rating: f64,
    pub unknown_title_policy: UnknownTitlePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// Load the persisted artifact once at startup.
    #[default]
    Artifact,
    /// Refit from the cached joined table on every request.
    Retrain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    pub model_source: ModelSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5500,
            },
            data: DataConfig {
                ratings_path: PathBuf::from("data/ratings.csv"),
                movies_path: PathBuf::from("data/movies.csv"),
                max_rows: 10_000,
                cache_path: PathBuf::from("data/user_item_matrix.csv"),
                model_path: PathBuf::from("data/nmf_model.json"),
            },
            training: TrainingConfig {
                n_components: 150,
                max_iter: 5_000,
                l1_ratio: 0.5,
                alpha: 0.0,
                tol: 1e-4,
                seed: 0,
                fill_rating: DEFAULT_FILL_RATING,
                max_reconstruction_error: None,
            },
            recommendation: RecommendationConfig {
                top_k: 5,
                fill_rating: DEFAULT_FILL_RATING,
                unknown_title_policy: UnknownTitlePolicy::Ignore,
            },
            serving: ServingConfig {
                model_source: ModelSource::Artifact,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MOVIEREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Self::default())
        }
    }
}
