//! JSON error bodies returned by the API routes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::config::Environment;

const HIDDEN_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Upstream stats proxy failed; the upstream message is always passed on
    pub fn proxy(upstream: &str, cause: impl std::fmt::Display) -> Self {
        error!("Error fetching {} API data: {}", upstream, cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: format!("Failed to fetch {} API data", upstream),
            message: cause.to_string(),
        }
    }

    /// No reference token could be fetched; the client may retry
    pub fn market_data_unavailable(environment: &Environment, cause: impl std::fmt::Display) -> Self {
        error!("Market data unavailable: {}", cause);
        Self {
            status: StatusCode::BAD_GATEWAY,
            error: "Market data unavailable".to_string(),
            message: Self::visible(environment, cause),
        }
    }

    pub fn internal(environment: &Environment, cause: impl std::fmt::Display) -> Self {
        error!("Server error: {}", cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error".to_string(),
            message: Self::visible(environment, cause),
        }
    }

    fn visible(environment: &Environment, cause: impl std::fmt::Display) -> String {
        if environment.is_production() {
            HIDDEN_MESSAGE.to_string()
        } else {
            cause.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
