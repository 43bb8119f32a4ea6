use tiktoken_rs::CoreBPE;

/// Known tokenizer families. Model hints fold onto one of these through a
/// deterministic substring table; anything unrecognized lands on the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerFamily {
    Cl100k,
    O200k,
}

impl TokenizerFamily {
    pub const DEFAULT: TokenizerFamily = TokenizerFamily::Cl100k;

    /// Map a free-form model hint to the nearest known family.
    ///
    /// Open-weight families (llama, mistral, qwen, ...) use their own
    /// vocabularies, but for chunk routing a fixed BPE is a close enough
    /// approximation, so they fold onto the default.
    pub fn from_model_hint(hint: &str) -> TokenizerFamily {
        let hint = hint.to_lowercase();

        const O200K_HINTS: &[&str] = &["gpt-4o", "gpt-4.1", "o1", "o3", "o4"];
        const CL100K_HINTS: &[&str] = &[
            "gpt-4",
            "gpt-3.5",
            "text-embedding",
            "llama",
            "mistral",
            "mixtral",
            "qwen",
            "gemma",
            "phi",
            "deepseek",
            "nomic",
        ];

        if O200K_HINTS.iter().any(|h| hint.contains(h)) {
            return TokenizerFamily::O200k;
        }
        if CL100K_HINTS.iter().any(|h| hint.contains(h)) {
            return TokenizerFamily::Cl100k;
        }
        TokenizerFamily::DEFAULT
    }
}

/// Thin wrapper over a byte-pair encoder, constructed once per pipeline and
/// reused for counting and window slicing.
pub struct Tokenizer {
    bpe: CoreBPE,
    family: TokenizerFamily,
}

impl Tokenizer {
    /// Resolve a tokenizer for a model hint. Never fails: if the mapped
    /// family's encoding cannot be loaded, falls back to the default family.
    pub fn for_model(hint: &str) -> Tokenizer {
        let family = TokenizerFamily::from_model_hint(hint);
        match Self::load(family) {
            Some(bpe) => Tokenizer { bpe, family },
            None => {
                tracing::warn!(model = hint, "tokenizer load failed, using default family");
                // The default vocabulary is embedded in the binary; loading it
                // cannot fail at runtime.
                let bpe = Self::load(TokenizerFamily::DEFAULT)
                    .expect("default tokenizer vocabulary is embedded");
                Tokenizer {
                    bpe,
                    family: TokenizerFamily::DEFAULT,
                }
            }
        }
    }

    fn load(family: TokenizerFamily) -> Option<CoreBPE> {
        match family {
            TokenizerFamily::Cl100k => tiktoken_rs::cl100k_base().ok(),
            TokenizerFamily::O200k => tiktoken_rs::o200k_base().ok(),
        }
    }

    pub fn family(&self) -> TokenizerFamily {
        self.family
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_with_special_tokens(text)
    }

    /// Decode a token slice back to text. Window boundaries can fall inside
    /// a multibyte character, so the byte stream is decoded lossily; the
    /// overlapping neighbor window carries the intact character.
    pub fn decode_lossy(&self, tokens: &[usize]) -> String {
        String::from_utf8_lossy(&self.bpe._decode_native(tokens)).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hints_map_to_families() {
        assert_eq!(
            TokenizerFamily::from_model_hint("gpt-4o-mini"),
            TokenizerFamily::O200k
        );
        assert_eq!(
            TokenizerFamily::from_model_hint("Llama3:8b"),
            TokenizerFamily::Cl100k
        );
    }

    #[test]
    fn unknown_hint_falls_back_to_default() {
        assert_eq!(
            TokenizerFamily::from_model_hint("some-custom-model"),
            TokenizerFamily::DEFAULT
        );
    }

    #[test]
    fn count_matches_encode_length() {
        let tok = Tokenizer::for_model("gpt-4");
        let text = "Requirements engineering is a discipline.";
        assert_eq!(tok.count(text), tok.encode(text).len());
    }
}
