//! Wire shapes for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body of a successful `/predict` call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeResponse {
    pub food_name: String,
    pub yolo_message: String,
    pub recipe: String,
    pub instructions: String,
}

/// Body returned when the classifier produced no label.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NoDetectionResponse {
    pub error: String,
    /// Always serialized as `null`.
    pub food_name: Option<String>,
}

/// Non-fault outcomes of `/predict`. Faults travel as `AppError`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictResponse {
    Recipe(RecipeResponse),
    NotDetected(NoDetectionResponse),
}

impl PredictResponse {
    pub fn not_detected(message: impl Into<String>) -> Self {
        PredictResponse::NotDetected(NoDetectionResponse {
            error: message.into(),
            food_name: None,
        })
    }
}

impl IntoResponse for PredictResponse {
    fn into_response(self) -> Response {
        match self {
            PredictResponse::Recipe(body) => (StatusCode::OK, Json(body)).into_response(),
            PredictResponse::NotDetected(body) => {
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
        }
    }
}
