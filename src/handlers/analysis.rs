use crate::AppState;
use crate::error::AppError;
use crate::handlers::{read_file_field, response_timestamp, stage_failure, validation_failure};
use crate::models::{CrmAnalysis, FilePayload, InitialAnalysis, QcReport};
use crate::services::extract;
use crate::services::provider::STAGE_CRM_ANALYSIS;
use crate::utils::validation::{UploadPolicy, validate_uploads};
use axum::{
    Json,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct CrmSuccessResponse {
    pub status: String,
    pub timestamp: String,
    pub analysis: CrmEnvelope,
}

#[derive(Serialize, ToSchema)]
pub struct CrmEnvelope {
    #[schema(value_type = Object)]
    pub crm: CrmAnalysis,
}

#[utoipa::path(
    post,
    path = "/analysis",
    request_body(content = Multipart, description = "Fields: `qcReport` (JSON), `initialAnalysis` (JSON), `image` (optional design image)"),
    responses(
        (status = 200, description = "CRM analysis completed, the QC gate failed, or the CRM stage failed (FAIL status in the body)", body = CrmSuccessResponse),
        (status = 400, description = "Required fields missing or not valid JSON")
    ),
    tag = "pipeline"
)]
pub async fn run_crm_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image: Option<FilePayload> = None;
    let mut qc_field: Option<String> = None;
    let mut initial_field: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(read_file_field(field).await?),
            "qcReport" => qc_field = Some(read_text_field(field).await?),
            "initialAnalysis" => initial_field = Some(read_text_field(field).await?),
            _ => {}
        }
    }

    let mut errors = validate_uploads(image.as_ref(), None, &UploadPolicy::crm(&state.config));

    // Stage outputs arrive from the caller, not from our own stage-1/2
    // calls; they are parsed leniently and never trusted.
    let qc_report: Option<QcReport> = parse_json_field("qcReport", qc_field.as_deref(), &mut errors);
    let initial: Option<InitialAnalysis> =
        parse_json_field("initialAnalysis", initial_field.as_deref(), &mut errors);

    if !errors.is_empty() {
        return Ok(validation_failure(errors));
    }
    let (Some(qc_report), Some(initial)) = (qc_report, initial) else {
        return Err(AppError::Internal(
            "required fields missing after validation".to_string(),
        ));
    };

    if !qc_report.passed() {
        tracing::info!(
            "CRM gate closed: overall_status was '{}'",
            qc_report.overall_status
        );
        return Ok(Json(json!({
            "status": "FAIL",
            "reason": "QC check did not pass",
            "qc_report": qc_report,
        }))
        .into_response());
    }

    let encoded = image.as_ref().map(extract::encode_image);
    match state
        .provider
        .generate_crm_analysis(&qc_report, &initial, encoded.as_ref())
        .await
    {
        Ok(crm) => Ok(Json(CrmSuccessResponse {
            status: "SUCCESS".to_string(),
            timestamp: response_timestamp(),
            analysis: CrmEnvelope { crm },
        })
        .into_response()),
        Err(e) => {
            tracing::error!("CRM analysis stage failed: {:#}", e);
            Ok(stage_failure(STAGE_CRM_ANALYSIS, &e, None))
        }
    }
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {e}")))
}

fn parse_json_field<T: serde::de::DeserializeOwned>(
    name: &str,
    raw: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<T> {
    let Some(raw) = raw else {
        errors.push(format!("The '{name}' field is required"));
        return None;
    };

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(format!("The '{name}' field is not valid JSON: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_field_reports_missing() {
        let mut errors = Vec::new();
        let parsed: Option<QcReport> = parse_json_field("qcReport", None, &mut errors);
        assert!(parsed.is_none());
        assert_eq!(errors, vec!["The 'qcReport' field is required".to_string()]);
    }

    #[test]
    fn parse_json_field_reports_bad_json() {
        let mut errors = Vec::new();
        let parsed: Option<QcReport> = parse_json_field("qcReport", Some("{oops"), &mut errors);
        assert!(parsed.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not valid JSON"));
    }

    #[test]
    fn parse_json_field_accepts_foreign_report_shape() {
        let mut errors = Vec::new();
        let parsed: Option<QcReport> =
            parse_json_field("qcReport", Some(r#"{"verdict": "fine"}"#), &mut errors);
        let report = parsed.expect("object without overall_status still parses");
        assert!(errors.is_empty());
        assert!(!report.passed());
    }
}
