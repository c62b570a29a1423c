use crate::algorithms::{LatentFactorModel, NmfModel};
use crate::error::{RecommenderError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub rating: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub genres: String,
}

/// One row of the joined ratings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRating {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub title: String,
    pub rating: f64,
}

/// Dense user × title ratings matrix (R).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsMatrix {
    pub user_ids: Vec<i64>,
    pub titles: Vec<String>,
    pub values: Array2<f64>,
}

impl RatingsMatrix {
    /// Pivots joined rows into users × titles. Users ascend by id and titles
    /// are sorted; cells without a rating hold `fill`. A repeated
    /// (user, title) pair keeps the last rating seen.
    pub fn pivot(rows: &[JoinedRating], fill: f64) -> Result<Self> {
        if rows.is_empty() {
            return Err(RecommenderError::InvalidInput(
                "cannot pivot an empty ratings table".to_string(),
            ));
        }

        let user_ids: Vec<i64> = rows
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let titles: Vec<String> = rows
            .iter()
            .map(|r| r.title.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index: HashMap<i64, usize> =
            user_ids.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let title_index: HashMap<&str, usize> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut values = Array2::from_elem((user_ids.len(), titles.len()), fill);
        for row in rows {
            let i = user_index[&row.user_id];
            let j = title_index[row.title.as_str()];
            values[[i, j]] = row.rating;
        }

        Ok(Self {
            user_ids,
            titles,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn title_index(&self) -> HashMap<&str, usize> {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect()
    }
}

/// User-feature matrix (P): users × latent components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeatures {
    pub user_ids: Vec<i64>,
    pub values: Array2<f64>,
}

/// Item-feature matrix (Q): latent components × titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFeatures {
    pub titles: Vec<String>,
    pub values: Array2<f64>,
}

/// Everything one training run produces, persisted as a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub ratings: RatingsMatrix,
    pub user_features: UserFeatures,
    pub item_features: ItemFeatures,
    pub model: NmfModel,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RecommenderError::Persistence(format!("{}: {}", parent.display(), e)))?;
        }

        let file = File::create(path)
            .map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;

        info!(
            "Saved model artifact to {} ({} users x {} titles, {} components)",
            path.display(),
            self.ratings.user_ids.len(),
            self.ratings.titles.len(),
            self.model.n_components()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecommenderError::data_access(path, e))?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;

        info!("Loaded model artifact from {} trained at {}", path.display(), artifact.trained_at);
        Ok(artifact)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedMovie {
    pub title: String,
    pub rating: f64,
}

impl RatedMovie {
    pub fn new(title: impl Into<String>, rating: f64) -> Self {
        Self {
            title: title.into(),
            rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub ratings: Vec<RatedMovie>,
}

impl RecommendationRequest {
    pub fn new(ratings: Vec<RatedMovie>) -> Self {
        Self { ratings }
    }

    /// Decodes the landing form: `movieN` is paired with `ratingN` by its
    /// index `N`, independent of field order. Blank pairs are skipped.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self> {
        let mut titles: BTreeMap<u32, &str> = BTreeMap::new();
        let mut ratings: BTreeMap<u32, &str> = BTreeMap::new();

        for (key, value) in fields {
            if let Some(index) = key.strip_prefix("movie") {
                titles.insert(parse_field_index(key, index)?, value.trim());
            } else if let Some(index) = key.strip_prefix("rating") {
                ratings.insert(parse_field_index(key, index)?, value.trim());
            }
        }

        let mut pairs = Vec::with_capacity(titles.len());
        for (index, title) in &titles {
            let rating = ratings.get(index).copied().unwrap_or_default();
            if title.is_empty() && rating.is_empty() {
                continue;
            }
            if title.is_empty() {
                return Err(RecommenderError::InvalidInput(format!("movie{} is empty", index)));
            }
            let rating: f64 = rating.parse().map_err(|_| {
                RecommenderError::InvalidInput(format!(
                    "rating{} is not a number: {:?}",
                    index, rating
                ))
            })?;
            pairs.push(RatedMovie::new(*title, rating));
        }

        if let Some(index) = ratings.keys().find(|i| !titles.contains_key(*i)) {
            return Err(RecommenderError::InvalidInput(format!(
                "rating{} has no matching movie{}",
                index, index
            )));
        }

        Ok(Self::new(pairs))
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.ratings.iter().map(|r| r.title.as_str())
    }
}

fn parse_field_index(key: &str, index: &str) -> Result<u32> {
    index
        .parse()
        .map_err(|_| RecommenderError::InvalidInput(format!("unexpected form field {:?}", key)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendationItem>,
    /// Submitted titles that are not columns of the ratings matrix.
    pub ignored_titles: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationResponse {
    pub fn titles(&self) -> Vec<String> {
        self.recommendations.iter().map(|r| r.title.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(user_id: i64, title: &str, rating: f64) -> JoinedRating {
        JoinedRating {
            user_id,
            title: title.to_string(),
            rating,
        }
    }

    #[test]
    fn test_pivot_fills_missing_cells() {
        let rows = vec![
            joined(2, "Heat", 4.0),
            joined(1, "Toy Story", 5.0),
            joined(1, "Heat", 3.0),
        ];
        let r = RatingsMatrix::pivot(&rows, 2.5).unwrap();

        assert_eq!(r.user_ids, vec![1, 2]);
        assert_eq!(r.titles, vec!["Heat".to_string(), "Toy Story".to_string()]);
        assert_eq!(r.values[[0, 0]], 3.0);
        assert_eq!(r.values[[0, 1]], 5.0);
        assert_eq!(r.values[[1, 0]], 4.0);
        assert_eq!(r.values[[1, 1]], 2.5);
        assert!(r.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pivot_last_duplicate_wins() {
        let rows = vec![joined(1, "Heat", 1.0), joined(1, "Heat", 4.5)];
        let r = RatingsMatrix::pivot(&rows, 2.5).unwrap();
        assert_eq!(r.shape(), (1, 1));
        assert_eq!(r.values[[0, 0]], 4.5);
    }

    #[test]
    fn test_pivot_rejects_empty_table() {
        assert!(RatingsMatrix::pivot(&[], 2.5).is_err());
    }

    #[test]
    fn test_from_form_pairs_by_index() {
        let fields: HashMap<String, String> = [
            ("rating2", "4"),
            ("movie1", "Toy Story"),
            ("movie2", "Heat"),
            ("rating1", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let request = RecommendationRequest::from_form(&fields).unwrap();
        assert_eq!(
            request.ratings,
            vec![RatedMovie::new("Toy Story", 5.0), RatedMovie::new("Heat", 4.0)]
        );
    }

    #[test]
    fn test_from_form_rejects_bad_rating() {
        let fields: HashMap<String, String> = [("movie1", "Heat"), ("rating1", "great")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(matches!(
            RecommendationRequest::from_form(&fields),
            Err(RecommenderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_form_rejects_orphan_rating() {
        let fields: HashMap<String, String> = [("movie1", "Heat"), ("rating1", "3"), ("rating7", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(RecommendationRequest::from_form(&fields).is_err());
    }

    #[test]
    fn test_from_form_skips_blank_pairs() {
        let fields: HashMap<String, String> = [("movie1", "Heat"), ("rating1", "3"), ("movie2", ""), ("rating2", "")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let request = RecommendationRequest::from_form(&fields).unwrap();
        assert_eq!(request.ratings.len(), 1);
    }
}
