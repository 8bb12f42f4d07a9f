//! Prompts for the three analysis stages.
//!
//! Centralising every prompt here keeps the stage operations in
//! [`crate::services::provider`] free of prompt engineering, and lets unit
//! tests inspect prompts without a live model.

use crate::models::{InitialAnalysis, QcReport};

/// Stage 1: analyze the design image against the PRD text.
const INITIAL_ANALYSIS_TEMPLATE: &str = r#"You are a senior design reviewer. You are given a product requirements document (PRD) and a design image. Analyze how well the design fulfils the PRD.

Respond with a single JSON object with these fields:
- "summary": one-paragraph assessment of the design
- "requirements_coverage": array of objects {"requirement", "addressed", "notes"}
- "visual_observations": array of strings describing notable visual elements
- "concerns": array of strings, empty if none

Output ONLY the JSON object, no commentary.

PRD TEXT:
"#;

/// Stage 2: quality-control check over the initial analysis.
const QC_CHECK_TEMPLATE: &str = r#"You are a quality-control auditor. You are given a PRD, a design image, and a prior analysis of that design. Verify the analysis and judge whether the design is ready to ship.

Respond with a single JSON object with these fields:
- "overall_status": exactly one of "PASS", "FAIL", "NEEDS_REVIEW"
- "checks": array of objects {"name", "status", "detail"}
- "issues": array of strings, empty if none

Output ONLY the JSON object, no commentary.
"#;

/// Stage 3: CRM impact analysis, gated on a passing QC report.
const CRM_ANALYSIS_TEMPLATE: &str = r#"You are a CRM strategist. A design has passed quality control. Using the QC report and the initial analysis below (and the design image when provided), assess the design's fit for CRM campaigns.

Respond with a single JSON object with these fields:
- "audience_fit": one-paragraph assessment
- "recommended_channels": array of strings
- "personalization_hooks": array of strings
- "risks": array of strings, empty if none

Output ONLY the JSON object, no commentary.
"#;

pub fn initial_analysis_prompt(prd_text: &str) -> String {
    format!("{INITIAL_ANALYSIS_TEMPLATE}{prd_text}")
}

pub fn qc_check_prompt(initial: &InitialAnalysis, prd_text: &str) -> String {
    format!(
        "{QC_CHECK_TEMPLATE}\nPRIOR ANALYSIS:\n{}\n\nPRD TEXT:\n{}",
        initial.0, prd_text
    )
}

pub fn crm_analysis_prompt(qc: &QcReport, initial: &InitialAnalysis) -> String {
    let qc_json = serde_json::to_string(qc).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{CRM_ANALYSIS_TEMPLATE}\nQC REPORT:\n{}\n\nINITIAL ANALYSIS:\n{}",
        qc_json, initial.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initial_prompt_embeds_prd_text() {
        let prompt = initial_analysis_prompt("The banner must show the summer logo.");
        assert!(prompt.contains("summer logo"));
        assert!(prompt.contains("requirements_coverage"));
    }

    #[test]
    fn qc_prompt_embeds_prior_analysis_and_statuses() {
        let initial = InitialAnalysis(json!({"summary": "looks close to spec"}));
        let prompt = qc_check_prompt(&initial, "PRD body");
        assert!(prompt.contains("looks close to spec"));
        assert!(prompt.contains("PRD body"));
        for status in ["PASS", "FAIL", "NEEDS_REVIEW"] {
            assert!(prompt.contains(status));
        }
    }

    #[test]
    fn crm_prompt_embeds_both_stage_outputs() {
        let initial = InitialAnalysis(json!({"summary": "ok"}));
        let qc: QcReport =
            serde_json::from_value(json!({"overall_status": "PASS", "issues": []})).unwrap();
        let prompt = crm_analysis_prompt(&qc, &initial);
        assert!(prompt.contains("\"overall_status\":\"PASS\""));
        assert!(prompt.contains("\"summary\":\"ok\""));
    }
}
