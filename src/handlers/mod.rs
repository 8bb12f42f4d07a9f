pub mod analysis;
pub mod health;
pub mod qc;

use crate::error::AppError;
use crate::models::{FilePayload, InitialAnalysis};
use axum::{
    Json,
    extract::multipart::Field,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// Buffer one multipart file field into a request-scoped payload.
pub(crate) async fn read_file_field(field: Field<'_>) -> Result<FilePayload, AppError> {
    let filename = field.file_name().unwrap_or("unnamed").to_string();
    let content_type = field.content_type().map(|s| s.to_string());
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {e}")))?;

    Ok(FilePayload {
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// ISO-8601 timestamp taken at response construction time.
pub(crate) fn response_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 400 envelope for upload/body validation failures.
pub(crate) fn validation_failure(errors: Vec<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": "FAIL",
            "errors": errors,
        })),
    )
        .into_response()
}

/// 200 envelope for a failed AI stage, carrying partial results so far.
pub(crate) fn stage_failure(
    stage: &str,
    error: &anyhow::Error,
    initial: Option<&InitialAnalysis>,
) -> Response {
    let mut body = json!({
        "status": "FAIL",
        "stage": stage,
        "error": format!("{error:#}"),
    });
    if let Some(initial) = initial {
        body["initial_analysis"] = initial.0.clone();
    }

    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_rfc3339() {
        let stamp = response_timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok(), "got: {stamp}");
    }
}
