pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AnalysisConfig;
use crate::services::provider::AnalysisProvider;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::qc::run_qc_pipeline,
        handlers::analysis::run_crm_analysis,
        handlers::health::health_check,
    ),
    components(
        schemas(
            handlers::qc::QcSuccessResponse,
            handlers::qc::QcAnalysis,
            handlers::analysis::CrmSuccessResponse,
            handlers::analysis::CrmEnvelope,
            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "pipeline", description = "Design QC and CRM analysis pipelines"),
        (name = "system", description = "Service health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn AnalysisProvider>,
    pub config: AnalysisConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/qc", post(handlers::qc::run_qc_pipeline))
        .route("/analysis", post(handlers::analysis::run_crm_analysis))
        .layer(from_fn(middleware::request_id::request_id_middleware))
        .with_state(state)
}
