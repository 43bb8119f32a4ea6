pub mod embeddings;
pub mod search;
pub mod store;

pub use embeddings::{EmbeddingError, EmbeddingModel, OllamaEmbedder};
pub use search::{SearchFilters, SearchHit, SearchWeights};
pub use store::{GraphError, GraphStats, GraphStore};
