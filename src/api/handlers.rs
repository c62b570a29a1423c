use super::{views, ApiResponse};
use crate::error::RecommenderError;
use crate::models::{RecommendationRequest, RecommendationResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use std::collections::HashMap;

pub async fn index() -> Html<String> {
    Html(views::index_page())
}

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "movierec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert(
        "model_source".to_string(),
        format!("{:?}", state.serving.model_source()).to_lowercase(),
    );

    Json(ApiResponse::success(status))
}

/// Form submission from the landing page.
pub async fn recommender(
    State(state): State<AppState>,
    Query(fields): Query<HashMap<String, String>>,
) -> Response {
    tracing::info!("Recommendation form submitted with {} fields", fields.len());

    let result = match RecommendationRequest::from_form(&fields) {
        Ok(request) => state.serving.recommend(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => Html(views::recommendations_page(&response)).into_response(),
        Err(e) => {
            log_failure(&e);
            (e.status_code(), Html(views::error_page(&e))).into_response()
        }
    }
}

pub async fn recommend_json(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, RecommenderError> {
    match state.serving.recommend(request).await {
        Ok(response) => Ok(Json(ApiResponse::success(response))),
        Err(e) => {
            log_failure(&e);
            Err(e)
        }
    }
}

fn log_failure(error: &RecommenderError) {
    if error.status_code().is_server_error() {
        tracing::error!("Failed to get recommendations: {}", error);
    } else {
        tracing::warn!("Rejected recommendation request: {}", error);
    }
}
