use crate::chunk::Chunk;
use crate::tokenizer::Tokenizer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap { chunk_size: usize, overlap: usize },
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// Splits text into token-bounded, overlapping chunks. Window geometry is
/// validated at construction so call sites never see a bad stride.
pub struct TokenChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TokenChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if chunk_size == 0 {
            return Err(ChunkerError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkerError::InvalidOverlap {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn count_tokens(&self, text: &str, model_hint: &str) -> usize {
        Tokenizer::for_model(model_hint).count(text)
    }

    /// Tokenize once, then slide a window of `chunk_size` tokens with stride
    /// `chunk_size - overlap`, decoding each window back to text. Texts that
    /// fit in a single window come back as one chunk. Defined for any text:
    /// windows whose boundary splits a multibyte character decode lossily
    /// rather than erroring.
    pub fn chunk(&self, text: &str, model_hint: &str) -> Vec<Chunk> {
        let tokenizer = Tokenizer::for_model(model_hint);
        self.chunk_with(&tokenizer, text)
    }

    pub fn chunk_with(&self, tokenizer: &Tokenizer, text: &str) -> Vec<Chunk> {
        let tokens = tokenizer.encode(text);
        let total_tokens = tokens.len();

        if total_tokens <= self.chunk_size {
            return vec![Chunk::single(text.to_string(), total_tokens)];
        }

        let stride = self.chunk_size - self.overlap;
        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(total_tokens);
            windows.push((start, end));
            if end == total_tokens {
                break;
            }
            start += stride;
        }

        let total = windows.len();
        let mut chunks = Vec::with_capacity(total);
        for (index, (start, end)) in windows.into_iter().enumerate() {
            let window = &tokens[start..end];
            chunks.push(Chunk {
                text: tokenizer.decode_lossy(window),
                token_count: window.len(),
                index,
                total,
            });
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Requirement number {i} states the system shall respond quickly."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        assert!(matches!(
            TokenChunker::new(100, 100),
            Err(ChunkerError::InvalidOverlap { .. })
        ));
        assert!(matches!(
            TokenChunker::new(100, 150),
            Err(ChunkerError::InvalidOverlap { .. })
        ));
        assert!(TokenChunker::new(100, 99).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TokenChunker::new(500, 50).unwrap();
        let chunks = chunker.chunk("A short requirement document.", "gpt-4");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].total, 1);
        assert_eq!(chunks[0].text, "A short requirement document.");
    }

    #[test]
    fn chunk_count_follows_stride_formula() {
        let chunk_size = 64;
        let overlap = 16;
        let chunker = TokenChunker::new(chunk_size, overlap).unwrap();
        let tokenizer = Tokenizer::for_model("gpt-4");
        let text = long_text(60);
        let total = tokenizer.count(&text);
        assert!(total > chunk_size, "test text must exceed one window");

        let chunks = chunker.chunk_with(&tokenizer, &text);
        let stride = chunk_size - overlap;
        let expected = (total - overlap).div_ceil(stride);
        assert_eq!(chunks.len(), expected);
        assert_eq!(chunks[0].total, chunks.len());
    }

    #[test]
    fn consecutive_chunks_overlap_by_exactly_overlap_tokens() {
        let chunk_size = 64;
        let overlap = 16;
        let chunker = TokenChunker::new(chunk_size, overlap).unwrap();
        let tokenizer = Tokenizer::for_model("gpt-4");
        let text = long_text(60);
        let tokens = tokenizer.encode(&text);

        let chunks = chunker.chunk_with(&tokenizer, &text);
        assert!(chunks.len() >= 2);

        let stride = chunk_size - overlap;
        for (i, pair) in chunks.windows(2).enumerate() {
            let start_a = i * stride;
            let end_a = (start_a + chunk_size).min(tokens.len());
            let start_b = (i + 1) * stride;
            // All but the final window are full-size, so the shared span is
            // exactly `overlap` tokens.
            if end_a == start_a + chunk_size {
                assert_eq!(end_a - start_b, overlap);
            }
            assert_eq!(pair[0].token_count, end_a - start_a);
        }
    }

    #[test]
    fn all_windows_but_last_are_full_size() {
        let chunker = TokenChunker::new(64, 16).unwrap();
        let tokenizer = Tokenizer::for_model("gpt-4");
        let chunks = chunker.chunk_with(&tokenizer, &long_text(60));
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.token_count, 64);
        }
        assert!(chunks[chunks.len() - 1].token_count <= 64);
    }

    #[test]
    fn multibyte_text_chunks_without_error() {
        // Cyrillic and emoji tokens span several bytes each, so window
        // boundaries regularly land mid-character.
        let chunker = TokenChunker::new(64, 8).unwrap();
        let tokenizer = Tokenizer::for_model("llama3");
        let text = (0..80)
            .map(|i| format!("Требование {i}: система должна отвечать быстро 🚀."))
            .collect::<Vec<_>>()
            .join(" ");
        assert!(tokenizer.count(&text) > 64);

        let chunks = chunker.chunk_with(&tokenizer, &text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
        // Interior text survives intact; only a boundary-split character may
        // be replaced, never dropped silently.
        assert!(chunks[0].text.contains("Требование 0"));
    }
}
