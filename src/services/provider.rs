//! Swappable client for the external generative-AI analysis service.

use crate::config::AnalysisConfig;
use crate::models::{CrmAnalysis, InitialAnalysis, QcReport};
use crate::services::extract::EncodedImage;
use crate::services::prompts;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Stage tags used in failure envelopes
pub const STAGE_INITIAL_ANALYSIS: &str = "initial_analysis";
pub const STAGE_QC_CHECK: &str = "qc_check";
pub const STAGE_CRM_ANALYSIS: &str = "crm_analysis";

/// Trait for analysis provider implementations.
///
/// Each operation is one blocking round trip to the external service; the
/// orchestration layer performs no retries of its own.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Stage 1: analyze the design image against the PRD text
    async fn generate_initial_analysis(
        &self,
        image: &EncodedImage,
        prd_text: &str,
    ) -> Result<InitialAnalysis>;

    /// Stage 2: quality-control check over the stage-1 output
    async fn perform_qc_check(
        &self,
        initial: &InitialAnalysis,
        image: &EncodedImage,
        prd_text: &str,
    ) -> Result<QcReport>;

    /// Stage 3: CRM analysis, run only after a passing QC report
    async fn generate_crm_analysis(
        &self,
        qc: &QcReport,
        initial: &InitialAnalysis,
        image: Option<&EncodedImage>,
    ) -> Result<CrmAnalysis>;

    /// Check if the provider is reachable/configured
    async fn health_check(&self) -> bool;
}

// ── Gemini wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Google Generative Language API client (`generateContent`)
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .context("GEMINI_API_KEY is not set")?;
        Self::new(
            api_key,
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateContentRequest {
            contents: vec![RequestContent { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.2,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, body);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .context("failed to decode Gemini response")?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .context("Gemini response contained no candidates")?;

        parse_json_payload(&text)
    }

    fn image_part(image: &EncodedImage) -> Part {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for GeminiProvider {
    async fn generate_initial_analysis(
        &self,
        image: &EncodedImage,
        prd_text: &str,
    ) -> Result<InitialAnalysis> {
        let parts = vec![
            Part::Text {
                text: prompts::initial_analysis_prompt(prd_text),
            },
            Self::image_part(image),
        ];
        let value = self.generate(parts).await?;
        Ok(InitialAnalysis(value))
    }

    async fn perform_qc_check(
        &self,
        initial: &InitialAnalysis,
        image: &EncodedImage,
        prd_text: &str,
    ) -> Result<QcReport> {
        let parts = vec![
            Part::Text {
                text: prompts::qc_check_prompt(initial, prd_text),
            },
            Self::image_part(image),
        ];
        let value = self.generate(parts).await?;
        serde_json::from_value(value).context("Gemini returned a malformed QC report")
    }

    async fn generate_crm_analysis(
        &self,
        qc: &QcReport,
        initial: &InitialAnalysis,
        image: Option<&EncodedImage>,
    ) -> Result<CrmAnalysis> {
        let mut parts = vec![Part::Text {
            text: prompts::crm_analysis_prompt(qc, initial),
        }];
        if let Some(image) = image {
            parts.push(Self::image_part(image));
        }
        let value = self.generate(parts).await?;
        Ok(CrmAnalysis(value))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);
        match self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Model output arrives as text; some models wrap JSON in markdown fences
/// even when asked not to.
fn parse_json_payload(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);

    serde_json::from_str(trimmed.trim()).context("provider returned a non-JSON payload")
}

/// No-op provider for development/testing
pub struct NoopProvider;

#[async_trait::async_trait]
impl AnalysisProvider for NoopProvider {
    async fn generate_initial_analysis(
        &self,
        _image: &EncodedImage,
        _prd_text: &str,
    ) -> Result<InitialAnalysis> {
        tracing::warn!("NoopProvider: returning canned initial analysis (development mode)");
        Ok(InitialAnalysis(serde_json::json!({
            "summary": "no-op provider: analysis not performed",
            "requirements_coverage": [],
            "visual_observations": [],
            "concerns": []
        })))
    }

    async fn perform_qc_check(
        &self,
        _initial: &InitialAnalysis,
        _image: &EncodedImage,
        _prd_text: &str,
    ) -> Result<QcReport> {
        tracing::warn!("NoopProvider: returning canned QC report (development mode)");
        Ok(QcReport {
            overall_status: QcReport::PASS.to_string(),
            details: serde_json::Map::new(),
        })
    }

    async fn generate_crm_analysis(
        &self,
        _qc: &QcReport,
        _initial: &InitialAnalysis,
        _image: Option<&EncodedImage>,
    ) -> Result<CrmAnalysis> {
        tracing::warn!("NoopProvider: returning canned CRM analysis (development mode)");
        Ok(CrmAnalysis(serde_json::json!({
            "audience_fit": "no-op provider: analysis not performed",
            "recommended_channels": [],
            "personalization_hooks": [],
            "risks": []
        })))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create the provider selected by config
pub fn create_provider(config: &AnalysisConfig) -> Result<Arc<dyn AnalysisProvider>> {
    match config.provider.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::from_config(config)?)),
        "noop" | "none" | "disabled" => Ok(Arc::new(NoopProvider)),
        other => {
            tracing::warn!("Unknown provider type '{}', using NoopProvider", other);
            Ok(Arc::new(NoopProvider))
        }
    }
}
