use crate::AppState;
use crate::error::AppError;
use crate::handlers::{read_file_field, response_timestamp, stage_failure, validation_failure};
use crate::models::{FilePayload, InitialAnalysis, QcReport};
use crate::services::extract;
use crate::services::provider::{STAGE_INITIAL_ANALYSIS, STAGE_QC_CHECK};
use crate::utils::validation::{UploadPolicy, validate_uploads};
use axum::{
    Json,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct QcSuccessResponse {
    pub status: String,
    pub timestamp: String,
    pub analysis: QcAnalysis,
}

#[derive(Serialize, ToSchema)]
pub struct QcAnalysis {
    #[schema(value_type = Object)]
    pub initial: InitialAnalysis,
    #[schema(value_type = Object)]
    pub qc: QcReport,
}

#[utoipa::path(
    post,
    path = "/qc",
    request_body(content = Multipart, description = "Fields: `image` (design image), `prd` (PRD PDF)"),
    responses(
        (status = 200, description = "Pipeline completed, or an AI stage failed (FAIL status with `stage` tag in the body)", body = QcSuccessResponse),
        (status = 400, description = "Upload validation failed")
    ),
    tag = "pipeline"
)]
pub async fn run_qc_pipeline(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image: Option<FilePayload> = None;
    let mut prd: Option<FilePayload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(read_file_field(field).await?),
            "prd" => prd = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    let policy = UploadPolicy::qc(&state.config);
    let errors = validate_uploads(image.as_ref(), prd.as_ref(), &policy);
    if !errors.is_empty() {
        return Ok(validation_failure(errors));
    }
    let (Some(image), Some(prd)) = (image, prd) else {
        return Err(AppError::Internal(
            "required uploads missing after validation".to_string(),
        ));
    };

    let encoded = extract::encode_image(&image);
    let prd_text = extract::extract_pdf_text(prd.bytes)
        .await
        .map_err(|e| AppError::PdfExtraction(format!("{e:#}")))?;

    let initial = match state
        .provider
        .generate_initial_analysis(&encoded, &prd_text)
        .await
    {
        Ok(initial) => initial,
        Err(e) => {
            tracing::error!("Initial analysis stage failed: {:#}", e);
            return Ok(stage_failure(STAGE_INITIAL_ANALYSIS, &e, None));
        }
    };

    let qc = match state
        .provider
        .perform_qc_check(&initial, &encoded, &prd_text)
        .await
    {
        Ok(qc) => qc,
        Err(e) => {
            tracing::error!("QC check stage failed: {:#}", e);
            return Ok(stage_failure(STAGE_QC_CHECK, &e, Some(&initial)));
        }
    };

    tracing::info!("QC pipeline completed with verdict '{}'", qc.overall_status);

    Ok(Json(QcSuccessResponse {
        status: "SUCCESS".to_string(),
        timestamp: response_timestamp(),
        analysis: QcAnalysis { initial, qc },
    })
    .into_response())
}
