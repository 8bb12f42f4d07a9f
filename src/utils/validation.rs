use crate::config::AnalysisConfig;
use crate::models::FilePayload;

/// Allowed MIME types for the uploaded design image
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Magic byte signatures for image type verification
const IMAGE_MAGIC_SIGNATURES: &[(&[u8], &str)] = &[
    (&[0xFF, 0xD8, 0xFF], "image/jpeg"),       // JPEG
    (&[0x89, 0x50, 0x4E, 0x47], "image/png"),  // PNG
    (&[0x52, 0x49, 0x46, 0x46], "image/webp"), // WEBP (RIFF)
    (&[0x47, 0x49, 0x46, 0x38], "image/gif"),  // GIF
];

/// PDF files start with "%PDF"
const PDF_MAGIC: &[u8] = &[0x25, 0x50, 0x44, 0x46];

/// Per-endpoint upload requirements.
///
/// The QC pipeline needs both files; the CRM pipeline accepts an optional
/// image and no PRD.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub require_image: bool,
    pub require_prd: bool,
    pub max_image_size: usize,
    pub max_prd_size: usize,
}

impl UploadPolicy {
    pub fn qc(config: &AnalysisConfig) -> Self {
        Self {
            require_image: true,
            require_prd: true,
            max_image_size: config.max_image_size,
            max_prd_size: config.max_prd_size,
        }
    }

    pub fn crm(config: &AnalysisConfig) -> Self {
        Self {
            require_image: false,
            require_prd: false,
            max_image_size: config.max_image_size,
            max_prd_size: config.max_prd_size,
        }
    }
}

/// Validates the uploaded file set against a policy.
///
/// Returns human-readable violation messages; an empty list means the
/// uploads are acceptable. Pure function: no I/O, no panics.
pub fn validate_uploads(
    image: Option<&FilePayload>,
    prd: Option<&FilePayload>,
    policy: &UploadPolicy,
) -> Vec<String> {
    let mut violations = Vec::new();

    match image {
        Some(file) => validate_image(file, policy.max_image_size, &mut violations),
        None if policy.require_image => {
            violations.push("An image file is required".to_string());
        }
        None => {}
    }

    match prd {
        Some(file) => validate_prd(file, policy.max_prd_size, &mut violations),
        None if policy.require_prd => {
            violations.push("A PRD file is required".to_string());
        }
        None => {}
    }

    violations
}

fn validate_image(file: &FilePayload, max_size: usize, violations: &mut Vec<String>) {
    if file.bytes.is_empty() {
        violations.push(format!("Image file '{}' is empty", file.filename));
        return;
    }

    if file.size() > max_size {
        violations.push(format!(
            "Image file '{}' is {} bytes, exceeding the {} MB limit",
            file.filename,
            file.size(),
            max_size / 1024 / 1024
        ));
    }

    let Some(mime) = declared_mime(file) else {
        violations.push(format!(
            "Image file '{}' is missing a content type",
            file.filename
        ));
        return;
    };

    if !ALLOWED_IMAGE_MIME_TYPES.iter().any(|&allowed| allowed == mime) {
        violations.push(format!(
            "Image MIME type '{}' is not allowed. Expected one of: {}",
            mime,
            ALLOWED_IMAGE_MIME_TYPES.join(", ")
        ));
        return;
    }

    let matches_declared = IMAGE_MAGIC_SIGNATURES
        .iter()
        .any(|(signature, mime_type)| file.bytes.starts_with(signature) && *mime_type == mime);
    if !matches_declared {
        violations.push(format!(
            "Image file '{}' does not look like '{}'",
            file.filename, mime
        ));
    }
}

fn validate_prd(file: &FilePayload, max_size: usize, violations: &mut Vec<String>) {
    if file.bytes.is_empty() {
        violations.push(format!("PRD file '{}' is empty", file.filename));
        return;
    }

    if file.size() > max_size {
        violations.push(format!(
            "PRD file '{}' is {} bytes, exceeding the {} MB limit",
            file.filename,
            file.size(),
            max_size / 1024 / 1024
        ));
    }

    let Some(mime) = declared_mime(file) else {
        violations.push(format!(
            "PRD file '{}' is missing a content type",
            file.filename
        ));
        return;
    };

    if mime != mime::APPLICATION_PDF.essence_str() {
        violations.push(format!(
            "PRD MIME type '{}' is not allowed. Only application/pdf is accepted",
            mime
        ));
        return;
    }

    if !file.bytes.starts_with(PDF_MAGIC) {
        violations.push(format!(
            "PRD file '{}' is not a valid PDF document",
            file.filename
        ));
    }
}

/// Declared MIME type with parameters stripped, lowercased.
fn declared_mime(file: &FilePayload) -> Option<String> {
    file.content_type.as_deref().map(|content_type| {
        content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> FilePayload {
        FilePayload {
            filename: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00],
        }
    }

    fn pdf(name: &str) -> FilePayload {
        FilePayload {
            filename: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.5 fake body".to_vec(),
        }
    }

    fn qc_policy() -> UploadPolicy {
        UploadPolicy::qc(&AnalysisConfig::default())
    }

    #[test]
    fn valid_pair_has_no_violations() {
        let image = png("banner.png");
        let prd = pdf("requirements.pdf");
        assert!(validate_uploads(Some(&image), Some(&prd), &qc_policy()).is_empty());
    }

    #[test]
    fn missing_both_files_reports_each() {
        let violations = validate_uploads(None, None, &qc_policy());
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("image"));
        assert!(violations[1].contains("PRD"));
    }

    #[test]
    fn crm_policy_allows_missing_files() {
        let policy = UploadPolicy::crm(&AnalysisConfig::default());
        assert!(validate_uploads(None, None, &policy).is_empty());
    }

    #[test]
    fn rejects_disallowed_image_mime() {
        let mut image = png("page.svg");
        image.content_type = Some("image/svg+xml".to_string());
        let violations = validate_uploads(Some(&image), Some(&pdf("p.pdf")), &qc_policy());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("image/svg+xml"));
    }

    #[test]
    fn rejects_content_mismatching_declared_type() {
        let mut image = png("fake.png");
        image.bytes = vec![0x4D, 0x5A, 0x00, 0x00]; // PE header
        let violations = validate_uploads(Some(&image), Some(&pdf("p.pdf")), &qc_policy());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("does not look like"));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let mut prd = pdf("spec.pdf");
        prd.content_type = Some("application/PDF; charset=binary".to_string());
        assert!(validate_uploads(Some(&png("a.png")), Some(&prd), &qc_policy()).is_empty());
    }

    #[test]
    fn rejects_empty_files() {
        let mut image = png("empty.png");
        image.bytes.clear();
        let violations = validate_uploads(Some(&image), Some(&pdf("p.pdf")), &qc_policy());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("empty"));
    }

    #[test]
    fn rejects_oversized_files() {
        let mut policy = qc_policy();
        policy.max_prd_size = 4;
        let violations = validate_uploads(Some(&png("a.png")), Some(&pdf("big.pdf")), &policy);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("exceeding"));
    }

    #[test]
    fn rejects_missing_content_type() {
        let mut image = png("typeless.png");
        image.content_type = None;
        let violations = validate_uploads(Some(&image), Some(&pdf("p.pdf")), &qc_policy());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("content type"));
    }

    #[test]
    fn non_pdf_bytes_with_pdf_mime_are_rejected() {
        let mut prd = pdf("scan.pdf");
        prd.bytes = b"PK\x03\x04not a pdf".to_vec();
        let violations = validate_uploads(Some(&png("a.png")), Some(&prd), &qc_policy());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("not a valid PDF"));
    }
}
