use crate::error::{RecommenderError, Result};
use crate::models::*;
use std::collections::HashSet;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;
const MAX_TITLE_LENGTH: usize = 512;
const MAX_SUBMITTED_RATINGS: usize = 100;

pub fn validate_rating(rating: f64) -> Result<()> {
    if !rating.is_finite() {
        return Err(RecommenderError::InvalidInput(
            "Rating contains invalid values (NaN or Infinity)".to_string(),
        ));
    }

    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(RecommenderError::InvalidInput(format!(
            "Rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )));
    }

    Ok(())
}

pub fn validate_recommendation_request(request: &RecommendationRequest) -> Result<()> {
    if request.ratings.is_empty() {
        return Err(RecommenderError::InvalidInput(
            "At least one rated movie is required".to_string(),
        ));
    }

    if request.ratings.len() > MAX_SUBMITTED_RATINGS {
        return Err(RecommenderError::InvalidInput(format!(
            "Too many rated movies (max {})",
            MAX_SUBMITTED_RATINGS
        )));
    }

    let mut seen = HashSet::new();
    for rated in &request.ratings {
        let title = rated.title.trim();
        if title.is_empty() {
            return Err(RecommenderError::InvalidInput("Movie title cannot be empty".to_string()));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(RecommenderError::InvalidInput(format!(
                "Movie title too long (max {} characters)",
                MAX_TITLE_LENGTH
            )));
        }
        if !seen.insert(title) {
            return Err(RecommenderError::InvalidInput(format!(
                "Movie {:?} was rated more than once",
                title
            )));
        }
        validate_rating(rated.rating)?;
    }

    Ok(())
}

pub fn validate_joined_rating(row: &JoinedRating) -> Result<()> {
    if row.title.is_empty() {
        return Err(RecommenderError::InvalidInput(format!(
            "User {} has a rating with an empty title",
            row.user_id
        )));
    }
    validate_rating(row.rating)
}
