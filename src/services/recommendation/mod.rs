use crate::algorithms::LatentFactorModel;
use crate::config::{RecommendationConfig, UnknownTitlePolicy};
use crate::error::{RecommenderError, Result};
use crate::models::*;
use crate::utils::{top_k_indices, validation::validate_recommendation_request};
use chrono::Utc;
use ndarray::{Array2, ArrayView2};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A new user's profile laid out over the ratings matrix columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// `1 × n_titles`
    pub values: Array2<f64>,
    /// Column indices of the submitted titles found in the schema.
    pub rated_columns: HashSet<usize>,
    /// Submitted titles that are not columns of the ratings matrix.
    pub unknown_titles: Vec<String>,
}

/// Sets each known submitted title to its rating and every other column to
/// `fill`.
pub fn build_profile(ratings: &RatingsMatrix, request: &RecommendationRequest, fill: f64) -> UserProfile {
    let index = ratings.title_index();
    let mut values = Array2::from_elem((1, ratings.titles.len()), fill);
    let mut rated_columns = HashSet::new();
    let mut unknown_titles = Vec::new();

    for rated in &request.ratings {
        let title = rated.title.trim();
        match index.get(title) {
            Some(&column) => {
                values[[0, column]] = rated.rating;
                rated_columns.insert(column);
            }
            None => unknown_titles.push(title.to_string()),
        }
    }

    UserProfile {
        values,
        rated_columns,
        unknown_titles,
    }
}

/// Projects `profile` through `model`, scores every title against
/// `item_features` and returns the best `k` columns the user has not rated.
pub fn rank_titles<M: LatentFactorModel + ?Sized>(
    model: &M,
    item_features: ArrayView2<'_, f64>,
    profile: &UserProfile,
    k: usize,
) -> Result<Vec<(usize, f64)>> {
    let latent = model.transform(profile.values.view())?;
    if latent.ncols() != item_features.nrows() {
        return Err(RecommenderError::Internal(format!(
            "latent width {} does not match item features {}",
            latent.ncols(),
            item_features.nrows()
        )));
    }

    let predicted = latent.dot(&item_features);
    let scores: Vec<f64> = predicted.row(0).to_vec();
    let top = top_k_indices(&scores, k, |column| profile.rated_columns.contains(&column));

    Ok(top.into_iter().map(|column| (column, scores[column])).collect())
}

/// Serves top-k recommendations from one immutable trained artifact.
#[derive(Debug, Clone)]
pub struct RecommendationService {
    artifact: Arc<ModelArtifact>,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(artifact: Arc<ModelArtifact>, config: RecommendationConfig) -> Self {
        Self { artifact, config }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        validate_recommendation_request(request)?;

        let artifact = &self.artifact;
        let profile = build_profile(&artifact.ratings, request, self.config.fill_rating);

        if !profile.unknown_titles.is_empty() {
            match self.config.unknown_title_policy {
                UnknownTitlePolicy::Reject => {
                    return Err(RecommenderError::UnknownTitle(profile.unknown_titles));
                }
                UnknownTitlePolicy::Ignore => {
                    warn!("Ignoring titles not in the ratings matrix: {:?}", profile.unknown_titles);
                }
            }
        }

        let ranked = rank_titles(
            &artifact.model,
            artifact.item_features.values.view(),
            &profile,
            self.config.top_k,
        )?;

        let recommendations: Vec<RecommendationItem> = ranked
            .into_iter()
            .map(|(column, score)| RecommendationItem {
                title: artifact.item_features.titles[column].clone(),
                score,
            })
            .collect();

        debug!("Scored {} titles", artifact.item_features.titles.len());
        info!(
            "Recommended {} titles for a profile of {} rated movies",
            recommendations.len(),
            request.ratings.len()
        );

        Ok(RecommendationResponse {
            recommendations,
            ignored_titles: profile.unknown_titles,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::NmfModel;
    use ndarray::array;

    /// Latent space equals title space; scores are the profile itself.
    struct Identity {
        eye: Array2<f64>,
    }

    impl LatentFactorModel for Identity {
        fn n_components(&self) -> usize {
            self.eye.nrows()
        }

        fn components(&self) -> ArrayView2<'_, f64> {
            self.eye.view()
        }

        fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            Ok(x.to_owned())
        }
    }

    fn ratings() -> RatingsMatrix {
        RatingsMatrix {
            user_ids: vec![1, 2],
            titles: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            values: array![[5.0, 1.0, 2.5, 3.0], [2.5, 4.0, 5.0, 2.5]],
        }
    }

    #[test]
    fn test_build_profile_tracks_unknown_titles() {
        let request = RecommendationRequest::new(vec![
            RatedMovie::new("B", 4.0),
            RatedMovie::new("Nope", 1.0),
        ]);
        let profile = build_profile(&ratings(), &request, 2.5);

        assert_eq!(profile.values, array![[2.5, 4.0, 2.5, 2.5]]);
        assert_eq!(profile.rated_columns, HashSet::from([1]));
        assert_eq!(profile.unknown_titles, vec!["Nope".to_string()]);
    }

    #[test]
    fn test_rank_titles_orders_and_excludes() {
        let model = Identity {
            eye: Array2::eye(4),
        };
        let profile = UserProfile {
            values: array![[1.0, 9.0, 3.0, 2.0]],
            rated_columns: HashSet::from([1]),
            unknown_titles: vec![],
        };

        let ranked = rank_titles(&model, model.eye.view(), &profile, 2).unwrap();
        assert_eq!(ranked, vec![(2, 3.0), (3, 2.0)]);
    }

    #[test]
    fn test_rank_titles_shape_mismatch() {
        let model = Identity {
            eye: Array2::eye(4),
        };
        let profile = UserProfile {
            values: array![[1.0, 2.0, 3.0, 4.0]],
            rated_columns: HashSet::new(),
            unknown_titles: vec![],
        };
        let wrong = Array2::<f64>::zeros((3, 4));
        assert!(rank_titles(&model, wrong.view(), &profile, 2).is_err());
    }

    fn service(policy: UnknownTitlePolicy) -> RecommendationService {
        let ratings = ratings();
        let model = NmfModel {
            config: crate::algorithms::Nmf::new(4),
            components: Array2::eye(4),
            n_iter: 0,
            reconstruction_err: 0.0,
        };
        let artifact = ModelArtifact {
            user_features: UserFeatures {
                user_ids: ratings.user_ids.clone(),
                values: ratings.values.clone(),
            },
            item_features: ItemFeatures {
                titles: ratings.titles.clone(),
                values: Array2::eye(4),
            },
            ratings,
            model,
            trained_at: Utc::now(),
        };
        RecommendationService::new(
            Arc::new(artifact),
            RecommendationConfig {
                top_k: 2,
                fill_rating: 2.5,
                unknown_title_policy: policy,
            },
        )
    }

    #[test]
    fn test_recommend_ignores_unknown_titles() {
        let request = RecommendationRequest::new(vec![
            RatedMovie::new("A", 5.0),
            RatedMovie::new("Nope", 5.0),
        ]);
        let response = service(UnknownTitlePolicy::Ignore).recommend(&request).unwrap();

        assert_eq!(response.recommendations.len(), 2);
        assert!(!response.titles().contains(&"A".to_string()));
        assert!(!response.titles().contains(&"Nope".to_string()));
        assert_eq!(response.ignored_titles, vec!["Nope".to_string()]);
    }

    #[test]
    fn test_recommend_rejects_unknown_titles() {
        let request = RecommendationRequest::new(vec![RatedMovie::new("Nope", 5.0)]);
        let err = service(UnknownTitlePolicy::Reject).recommend(&request).unwrap_err();
        assert!(matches!(err, RecommenderError::UnknownTitle(titles) if titles == vec!["Nope".to_string()]));
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let svc = service(UnknownTitlePolicy::Ignore);
        let request = RecommendationRequest::new(vec![RatedMovie::new("C", 1.0)]);
        let first = svc.recommend(&request).unwrap();
        let second = svc.recommend(&request).unwrap();
        assert_eq!(first.recommendations, second.recommendations);
    }
}
