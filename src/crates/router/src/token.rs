//! Token estimation for chunk sizing.
//!
//! Counts are estimates. The `cl100k_base` encoding is exact only for the
//! OpenAI models that use it, and the fixed-ratio fallback (one token per four
//! characters) is lossy for every model. Chunk boundaries derived from these
//! counts are therefore approximate.

use std::fmt;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Characters per token assumed by the fixed-ratio approximation.
pub const CHARS_PER_TOKEN: usize = 4;

/// Fixed-ratio token estimate: `chars / 4`.
pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Estimates how many tokens a text span consumes.
#[derive(Clone)]
pub struct TokenEstimator {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenEstimator {
    /// Use the `cl100k_base` encoding, falling back to the fixed ratio if the
    /// encoder cannot be built.
    pub fn new() -> Self {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Self {
                bpe: Some(Arc::new(bpe)),
            },
            Err(e) => {
                debug!(error = %e, "cl100k_base unavailable, using 4 chars/token");
                Self::approximate()
            }
        }
    }

    /// Always use the fixed ratio.
    pub fn approximate() -> Self {
        Self { bpe: None }
    }

    /// True when counts come from a BPE encoder.
    pub fn is_bpe(&self) -> bool {
        self.bpe.is_some()
    }

    /// Estimated token count of `text`. Never fails.
    pub fn estimate(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => approximate_tokens(text),
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_bpe() { "cl100k_base" } else { "approximate" };
        f.debug_struct("TokenEstimator").field("mode", &mode).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate() {
        let estimator = TokenEstimator::approximate();
        assert!(!estimator.is_bpe());
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("abc"), 0);
        assert_eq!(estimator.estimate("abcdefgh"), 2);
    }

    #[test]
    fn test_approximate_counts_chars_not_bytes() {
        // 8 chars, 16 bytes
        assert_eq!(approximate_tokens("абвгдежз"), 2);
    }

    #[test]
    fn test_bpe_estimate() {
        let estimator = TokenEstimator::new();
        if estimator.is_bpe() {
            assert_eq!(estimator.estimate(""), 0);
            assert!(estimator.estimate("Hello, world!") > 0);
            assert!(estimator.estimate("Hello, world!") < 13);
        }
    }
}
