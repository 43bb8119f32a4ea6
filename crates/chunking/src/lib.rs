pub mod chunk;
pub mod chunker;
pub mod tokenizer;

pub use chunk::Chunk;
pub use chunker::{ChunkerError, TokenChunker};
pub use tokenizer::{Tokenizer, TokenizerFamily};
