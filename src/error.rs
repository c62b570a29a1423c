use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::Path;

/// Errors raised by the matrix builder, trainer and recommender.
#[derive(thiserror::Error, Debug)]
pub enum RecommenderError {
    #[error("Failed to read {path}: {reason}")]
    DataAccess { path: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown titles: {}", .0.join(", "))]
    UnknownTitle(Vec<String>),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommenderError {
    pub fn data_access(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Self::DataAccess {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommenderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecommenderError::UnknownTitle(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RecommenderError::DataAccess { .. }
            | RecommenderError::Training(_)
            | RecommenderError::Persistence(_)
            | RecommenderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecommenderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RecommenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RecommenderError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RecommenderError::UnknownTitle(vec!["Nope".into()]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RecommenderError::data_access("ratings.csv", "missing").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_title_message_lists_titles() {
        let err = RecommenderError::UnknownTitle(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "Unknown titles: A, B");
    }
}
