use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document format '{0}'")]
    UnsupportedFormat(String),
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub format: String,
    pub source: String,
}

/// The document-text extractor collaborator. Failures are per-file and
/// non-fatal to a multi-file job.
pub trait DocumentExtractor: Send + Sync {
    fn extract(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<ExtractedDocument, ExtractionError>> + Send;
}

/// Plain-text extractor for local files. Binary formats (pdf, docx) belong
/// to an external extraction service behind the same trait.
pub struct FsDocumentExtractor;

impl DocumentExtractor for FsDocumentExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" | "md" => {
                let text = fs::read_to_string(path).await?;
                Ok(ExtractedDocument {
                    text,
                    format: extension,
                    source: path.to_string_lossy().to_string(),
                })
            }
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_plain_text() {
        let dir = std::env::temp_dir();
        let path = dir.join("pipeline_doc_test.txt");
        tokio::fs::write(&path, "The system shall work.").await.unwrap();

        let doc = FsDocumentExtractor.extract(&path).await.unwrap();
        assert_eq!(doc.text, "The system shall work.");
        assert_eq!(doc.format, "txt");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn unsupported_format_is_typed() {
        let err = FsDocumentExtractor
            .extract(Path::new("spec.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(f) if f == "pdf"));
    }
}
