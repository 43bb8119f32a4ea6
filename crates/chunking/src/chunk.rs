use serde::{Deserialize, Serialize};

/// A token-bounded slice of a larger document. Ephemeral: chunks are
/// prompt-building material and are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub token_count: usize,
    /// Zero-based position of this chunk within the document.
    pub index: usize,
    /// Total number of chunks the document was split into.
    pub total: usize,
}

impl Chunk {
    pub fn single(text: String, token_count: usize) -> Self {
        Self {
            text,
            token_count,
            index: 0,
            total: 1,
        }
    }
}
