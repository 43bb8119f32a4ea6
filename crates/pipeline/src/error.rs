use chunking::ChunkerError;
use graph::{EmbeddingError, GraphError};
use thiserror::Error;

/// Job-fatal failures. Per-unit failures (one file, one chunk, one edge)
/// never surface here; they are logged and skipped at their own boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Chunker(#[from] ChunkerError),
    #[error("no chunk produced generation output: {0}")]
    GenerationExhausted(String),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Persistence(#[from] GraphError),
}
