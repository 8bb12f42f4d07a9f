use std::env;

/// Configuration for the analysis pipelines
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum uploaded image size in bytes (default: 10 MB)
    pub max_image_size: usize,

    /// Maximum uploaded PRD size in bytes (default: 20 MB)
    pub max_prd_size: usize,

    /// Analysis provider type: "gemini" or "noop" (default: "gemini")
    pub provider: String,

    /// Gemini API key (required for the "gemini" provider)
    pub gemini_api_key: Option<String>,

    /// Gemini model name (default: "gemini-1.5-flash")
    pub gemini_model: String,

    /// Gemini API base URL, overridable for tests
    pub gemini_base_url: String,

    /// Timeout for a single provider round trip in seconds (default: 120)
    pub request_timeout_secs: u64,

    /// Listen port (default: 3000)
    pub port: u16,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_image_size: 10 * 1024 * 1024,
            max_prd_size: 20 * 1024 * 1024,
            provider: "gemini".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            request_timeout_secs: 120,
            port: 3000,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_image_size: env::var("MAX_IMAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_image_size),

            max_prd_size: env::var("MAX_PRD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_prd_size),

            provider: env::var("ANALYSIS_PROVIDER").unwrap_or(default.provider),

            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),

            gemini_model: env::var("GEMINI_MODEL").unwrap_or(default.gemini_model),

            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or(default.gemini_base_url),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.request_timeout_secs),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),
        }
    }

    /// Create config for development (no external provider, relaxed limits)
    pub fn development() -> Self {
        Self {
            provider: "noop".to_string(),
            ..Self::default()
        }
    }

    /// Request body ceiling for the multipart intake: both files plus
    /// form-field overhead.
    pub fn max_body_size(&self) -> usize {
        self.max_image_size + self.max_prd_size + 64 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_image_size, 10 * 1024 * 1024);
        assert_eq!(config.max_prd_size, 20 * 1024 * 1024);
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = AnalysisConfig::development();
        assert_eq!(config.provider, "noop");
    }

    #[test]
    fn test_body_limit_covers_both_files() {
        let config = AnalysisConfig::default();
        assert!(config.max_body_size() > config.max_image_size + config.max_prd_size);
    }
}
