//! Content extraction: raw upload bytes → provider-ready payloads.

use crate::models::FilePayload;
use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};

/// A base64 image payload ready to embed in a provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Standard-alphabet base64, no line wrapping
    pub data: String,
    pub mime_type: String,
}

/// Encode an uploaded image for the provider API.
///
/// Total function: any byte sequence encodes; the upload validator is the
/// place that decides whether the bytes were an acceptable image at all.
pub fn encode_image(file: &FilePayload) -> EncodedImage {
    let data = STANDARD.encode(&file.bytes);
    tracing::debug!(
        "Encoded image '{}' → {} bytes base64",
        file.filename,
        data.len()
    );

    EncodedImage {
        data,
        mime_type: file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

/// Extract plain text from a PRD PDF.
///
/// Parsing is CPU-bound, so it runs on the blocking pool. A malformed or
/// unreadable document is a hard error for the whole request.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    tokio::task::spawn_blocking(move || extract_pdf_text_sync(&bytes))
        .await
        .map_err(|e| anyhow!("PDF extraction task failed: {e}"))?
}

fn extract_pdf_text_sync(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).context("failed to parse PDF document")?;

    if doc.is_encrypted() {
        bail!("PDF document is encrypted");
    }

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        bail!("PDF document has no pages");
    }

    let mut text = String::new();
    for page in pages {
        match doc.extract_text(&[page]) {
            Ok(page_text) => {
                let page_text = page_text.trim_end();
                if !page_text.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(page_text);
                }
            }
            Err(e) => {
                tracing::debug!("No extractable text on page {}: {}", page, e);
            }
        }
    }

    if text.trim().is_empty() {
        bail!("PDF document contains no extractable text");
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8], content_type: Option<&str>) -> FilePayload {
        FilePayload {
            filename: "upload.bin".to_string(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.to_vec(),
        }
    }

    /// Minimal one-page PDF with a single text run, built in memory.
    fn sample_pdf(body_text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(body_text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("serialize test PDF");
        buf
    }

    #[test]
    fn encode_image_is_deterministic() {
        let file = payload(b"hello", Some("image/png"));
        let encoded = encode_image(&file);
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(encode_image(&file), encoded);
    }

    #[test]
    fn encode_image_defaults_missing_mime() {
        let encoded = encode_image(&payload(&[0xFF, 0x00], None));
        assert_eq!(encoded.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn extracts_text_from_a_generated_pdf() {
        let text = extract_pdf_text(sample_pdf("Launch banner requirements"))
            .await
            .expect("extraction should succeed");
        assert!(text.contains("Launch banner requirements"), "got: {text}");
    }

    #[tokio::test]
    async fn malformed_pdf_is_an_error() {
        let result = extract_pdf_text(b"%PDF-1.5 truncated garbage".to_vec()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_an_error() {
        let result = extract_pdf_text(b"just some text".to_vec()).await;
        assert!(result.is_err());
    }
}
