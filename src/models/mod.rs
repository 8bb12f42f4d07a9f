use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One uploaded file, alive for the duration of a single request.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Opaque structured result of the initial analysis stage.
///
/// The service never inspects its contents; it is passed into the QC stage
/// and relayed to the caller exactly as the provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitialAnalysis(pub Value);

/// Opaque structured result of the CRM analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrmAnalysis(pub Value);

/// Quality-control report produced by the QC stage.
///
/// On the `/analysis` endpoint this arrives from the caller, not from our
/// own stage-2 call, so deserialization must tolerate anything: a missing
/// or foreign `overall_status` simply fails the gate. Extra fields are kept
/// so the report relayed back to the caller is the one they sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    #[serde(default)]
    pub overall_status: String,

    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl QcReport {
    pub const PASS: &'static str = "PASS";

    /// Whether this report allows the CRM stage to run.
    pub fn passed(&self) -> bool {
        self.overall_status == Self::PASS
    }
}
