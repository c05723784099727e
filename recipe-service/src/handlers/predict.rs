use crate::dtos::{PredictResponse, RecipeResponse};
use crate::services::{is_allowed_file, TempUpload};
use crate::startup::AppState;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use service_core::error::AppError;

const NO_FILE_PART: &str = "No file part in the request";
const NO_SELECTED_FILE: &str = "No selected file";
const FILE_TYPE_NOT_ALLOWED: &str = "File type not allowed";
const FILE_TOO_LARGE: &str = "File too large";

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{}", message))
}

/// Maps a body over the upload cap to 413, anything else through `otherwise`.
fn multipart_error(e: MultipartError, otherwise: fn(anyhow::Error) -> AppError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %e, "Rejected upload over the size limit");
        return AppError::PayloadTooLarge(anyhow::anyhow!("{}", FILE_TOO_LARGE));
    }
    otherwise(anyhow::anyhow!("{}", e))
}

/// `POST /predict`: detect the food in an uploaded photo and fetch a recipe for it.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictResponse, AppError> {
    // A body that is not multipart at all carries no file part either.
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Rejected non-multipart request");
        bad_request(NO_FILE_PART)
    })?;

    let (filename, data) = loop {
        let next = multipart.next_field().await.map_err(|e| {
            multipart_error(e, |e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
            })
        })?;

        let Some(field) = next else {
            return Err(bad_request(NO_FILE_PART));
        };
        // Plain form values named `file` are not file parts.
        let (Some("file"), Some(filename)) = (field.name(), field.file_name()) else {
            continue;
        };

        let filename = filename.to_string();
        if filename.is_empty() {
            return Err(bad_request(NO_SELECTED_FILE));
        }
        if !is_allowed_file(&filename) {
            tracing::warn!(filename = %filename, "Rejected upload with disallowed extension");
            return Err(bad_request(FILE_TYPE_NOT_ALLOWED));
        }

        let data = field.bytes().await.map_err(|e| {
            tracing::error!(filename = %filename, error = %e, "Failed to read upload body");
            multipart_error(e, AppError::ProcessingError)
        })?;

        break (filename, data);
    };

    // Dropped on every path out of this function, which removes the file.
    let upload = TempUpload::persist(&state.upload_dir, &filename, &data)
        .await
        .map_err(|e| {
            tracing::error!(filename = %filename, error = %e, "Failed to store upload");
            AppError::ProcessingError(e.into())
        })?;

    let detection = state.classifier.detect(upload.path()).await;

    let Some(food_name) = detection.label else {
        tracing::info!(message = %detection.message, "No food detected");
        return Ok(PredictResponse::not_detected(detection.message));
    };

    let (recipe, instructions) = state
        .generator
        .generate(&food_name)
        .await
        .into_response_parts();

    Ok(PredictResponse::Recipe(RecipeResponse {
        food_name,
        yolo_message: detection.message,
        recipe,
        instructions,
    }))
}
