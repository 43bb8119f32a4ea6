pub mod config;
pub mod documents;
pub mod error;
pub mod orchestrator;
pub mod retry;

pub use config::{PipelineConfig, RetryConfig};
pub use documents::{DocumentExtractor, ExtractedDocument, ExtractionError, FsDocumentExtractor};
pub use error::PipelineError;
pub use orchestrator::{
    ChunkFailure, ChunkFailureKind, ExtractionOutcome, ExtractionPipeline, ExtractionRequest,
};
pub use retry::RetryPolicy;
