use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Window size in tokens for chunked extraction.
    pub chunk_size: usize,
    /// Token overlap between consecutive chunks; must stay below chunk_size.
    pub chunk_overlap: usize,
    /// Documents at or under this token count are processed as one chunk.
    pub sync_token_threshold: usize,
    /// Whether the merged result is handed to the graph store.
    pub persist: bool,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            sync_token_threshold: 4000,
            persist: true,
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
        }
    }
}
