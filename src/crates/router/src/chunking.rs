//! Splitting text into bounded, overlapping segments.
//!
//! # Strategies
//!
//! - **fixed_size**: windows of `chunk_size_tokens * 4` characters. A window
//!   that stops short of the end of the text is snapped back to the last
//!   sentence or line break, if that break lies past 70% of the window. The
//!   next window starts `overlap_tokens * 4` characters before the previous
//!   one ended.
//! - **semantic**: paragraphs (split on blank lines) packed greedily up to
//!   `chunk_size_tokens`; each new segment repeats the last paragraph of the
//!   previous one.
//! - **sliding_window**: same algorithm as `fixed_size`.

use crate::error::{Result, RouterError};
use crate::token::{TokenEstimator, CHARS_PER_TOKEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Break markers, in priority order.
const BOUNDARY_MARKERS: [&str; 5] = [". ", "! ", "? ", "\n\n", "\n"];

/// A break is only taken past this fraction of the window.
const MIN_BREAK_FRACTION: f64 = 0.7;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// How text is split into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ChunkStrategy {
    #[default]
    FixedSize,
    Semantic,
    SlidingWindow,
}

impl From<String> for ChunkStrategy {
    /// Unknown names fall back to `fixed_size`.
    fn from(name: String) -> Self {
        match name.as_str() {
            "semantic" => ChunkStrategy::Semantic,
            "sliding_window" => ChunkStrategy::SlidingWindow,
            _ => ChunkStrategy::FixedSize,
        }
    }
}

/// How per-segment outputs are merged into one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Aggregation {
    #[default]
    Concatenate,
    MajorityVote,
    AverageScore,
}

impl From<String> for Aggregation {
    /// Unknown names fall back to `concatenate`.
    fn from(name: String) -> Self {
        match name.as_str() {
            "majority_vote" => Aggregation::MajorityVote,
            "average_score" => Aggregation::AverageScore,
            _ => Aggregation::Concatenate,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Concatenate => write!(f, "concatenate"),
            Aggregation::MajorityVote => write!(f, "majority_vote"),
            Aggregation::AverageScore => write!(f, "average_score"),
        }
    }
}

/// Chunking and aggregation settings of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: ChunkStrategy,

    /// Target segment size in tokens.
    #[serde(default = "default_chunk_size", alias = "chunk_size")]
    pub chunk_size_tokens: usize,

    /// Tokens shared between consecutive segments.
    #[serde(default = "default_overlap", alias = "overlap")]
    pub overlap_tokens: usize,

    #[serde(default)]
    pub aggregation: Aggregation,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            strategy: ChunkStrategy::default(),
            chunk_size_tokens: default_chunk_size(),
            overlap_tokens: default_overlap(),
            aggregation: Aggregation::default(),
        }
    }
}

impl ChunkingConfig {
    /// Send the whole text as one segment.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set segment size and overlap, both in tokens.
    pub fn with_size(mut self, chunk_size_tokens: usize, overlap_tokens: usize) -> Self {
        self.chunk_size_tokens = chunk_size_tokens;
        self.overlap_tokens = overlap_tokens;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Reject sizes that would stall or misbehave while splitting. A disabled
    /// config never splits, so its sizes are not checked.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.chunk_size_tokens == 0 {
            return Err(RouterError::InvalidConfig(
                "chunk_size_tokens must be greater than 0".to_string(),
            ));
        }
        if self.overlap_tokens >= self.chunk_size_tokens {
            return Err(RouterError::InvalidConfig(format!(
                "overlap_tokens ({}) must be less than chunk_size_tokens ({})",
                self.overlap_tokens, self.chunk_size_tokens
            )));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_chunk_size() -> usize {
    8000
}

fn default_overlap() -> usize {
    500
}

/// Splits text into segments per a [`ChunkingConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChunkingEngine {
    estimator: TokenEstimator,
}

impl ChunkingEngine {
    pub fn new(estimator: TokenEstimator) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Split `text` into ordered segments.
    ///
    /// A disabled config returns the text as its only segment. Otherwise the
    /// config is validated before any splitting. Fixed-size segments keep
    /// their surrounding whitespace, so dropping the overlap from each and
    /// concatenating them gives back `text` byte for byte.
    pub fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
        if !config.enabled {
            return Ok(vec![text.to_string()]);
        }
        config.validate()?;

        let segments = match config.strategy {
            ChunkStrategy::FixedSize | ChunkStrategy::SlidingWindow => {
                fixed_size_spans(text, config)
                    .into_iter()
                    .map(|span| text[span].to_string())
                    .collect()
            }
            ChunkStrategy::Semantic => self.semantic_chunks(text, config),
        };

        debug!(
            strategy = ?config.strategy,
            chars = text.len(),
            segments = segments.len(),
            "text chunked"
        );
        Ok(segments)
    }

    fn semantic_chunks(&self, text: &str, config: &ChunkingConfig) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for paragraph in text.split(PARAGRAPH_SEPARATOR) {
            let tokens = self.estimator.estimate(paragraph);

            if !current.is_empty() && current_tokens + tokens > config.chunk_size_tokens {
                chunks.push(current.join(PARAGRAPH_SEPARATOR));
                // Carry the last paragraph forward as overlap.
                if let Some(last) = current.pop() {
                    current.clear();
                    current.push(last);
                    current_tokens = self.estimator.estimate(last);
                }
            }

            current.push(paragraph);
            current_tokens += tokens;
        }

        if !current.is_empty() {
            chunks.push(current.join(PARAGRAPH_SEPARATOR));
        }

        chunks.retain(|chunk| !chunk.trim().is_empty());
        chunks
    }
}

/// Untrimmed byte ranges of the fixed-size windows over `text`.
///
/// Consecutive spans overlap by at most `overlap_tokens * 4` characters and
/// together cover the whole text. Start offsets strictly increase.
pub(crate) fn fixed_size_spans(text: &str, config: &ChunkingConfig) -> Vec<Range<usize>> {
    let window = config.chunk_size_tokens * CHARS_PER_TOKEN;
    let overlap = config.overlap_tokens * CHARS_PER_TOKEN;

    // Byte offset of every char boundary, including the end.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut spans = Vec::new();
    let mut start = 0;
    while start < total {
        let mut end = (start + window).min(total);

        if end < total {
            let candidate = &text[bounds[start]..bounds[end]];
            if let Some(cut) = boundary_cut(candidate, window) {
                end = start + cut;
            }
        }

        spans.push(bounds[start]..bounds[end]);
        if end >= total {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    spans
}

/// Char length to keep from `window_text`, if a break lies past the threshold.
fn boundary_cut(window_text: &str, window: usize) -> Option<usize> {
    let threshold = window as f64 * MIN_BREAK_FRACTION;

    BOUNDARY_MARKERS.iter().find_map(|marker| {
        let pos = window_text.rfind(marker)?;
        let char_pos = window_text[..pos].chars().count();
        (char_pos as f64 > threshold).then(|| char_pos + marker.chars().count())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::approximate_tokens;

    fn engine() -> ChunkingEngine {
        ChunkingEngine::new(TokenEstimator::approximate())
    }

    fn fixed(chunk: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig::default().with_size(chunk, overlap)
    }

    /// Rebuild the text from spans, dropping the overlapped prefix of each.
    fn reconstruct(text: &str, spans: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            let from = span.start.max(covered);
            out.push_str(&text[from..span.end]);
            covered = span.end;
        }
        out
    }

    /// Rebuild the text from returned segments. Consecutive fixed-size
    /// segments share `overlap_tokens * 4` chars unless the earlier one is
    /// no longer than that, in which case they share none.
    fn rejoin(segments: &[String], config: &ChunkingConfig) -> String {
        let overlap = config.overlap_tokens * CHARS_PER_TOKEN;
        let mut out = String::new();
        let mut previous: Option<&String> = None;
        for segment in segments {
            let shared = match previous {
                Some(prev) if prev.chars().count() > overlap => overlap,
                _ => 0,
            };
            if let Some(prev) = previous {
                let tail: String = prev.chars().skip(prev.chars().count() - shared).collect();
                let head: String = segment.chars().take(shared).collect();
                assert_eq!(tail, head, "overlap mismatch");
            }
            out.extend(segment.chars().skip(shared));
            previous = Some(segment);
        }
        out
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for i in 0..60 {
            text.push_str(&format!("Sentence number {} talks about things. ", i));
            if i % 7 == 6 {
                text.push_str("Really? Yes!\n\n");
            }
        }
        text
    }

    #[test]
    fn test_disabled_returns_text_unchanged() {
        let config = ChunkingConfig::disabled();
        for text in ["", "  padded  ", "a. b. c.\n\nd"] {
            assert_eq!(engine().chunk(text, &config).unwrap(), vec![text.to_string()]);
        }

        // Sizes are irrelevant when nothing is split.
        for config in [
            ChunkingConfig::disabled().with_size(0, 0),
            ChunkingConfig::disabled().with_size(5, 9),
        ] {
            assert!(config.validate().is_ok());
            assert_eq!(engine().chunk("hello world", &config).unwrap(), vec!["hello world"]);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(engine().chunk("text", &fixed(0, 0)).is_err());
        assert!(engine().chunk("text", &fixed(10, 10)).is_err());
        let err = engine().chunk("text", &fixed(10, 20)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidConfig(_)));
        let semantic = fixed(0, 0).with_strategy(ChunkStrategy::Semantic);
        assert!(engine().chunk("text", &semantic).is_err());
    }

    #[test]
    fn test_short_text_is_one_segment() {
        let segments = engine().chunk("hello world", &fixed(100, 10)).unwrap();
        assert_eq!(segments, vec!["hello world"]);
    }

    #[test]
    fn test_fixed_size_spans_cover_text() {
        let text = sample_text();
        for (chunk, overlap) in [(10, 0), (10, 2), (25, 5), (7, 6), (1000, 10)] {
            let spans = fixed_size_spans(&text, &fixed(chunk, overlap));
            assert_eq!(spans.first().unwrap().start, 0);
            assert_eq!(spans.last().unwrap().end, text.len());
            assert_eq!(reconstruct(&text, &spans), text, "chunk={chunk} overlap={overlap}");
        }
    }

    #[test]
    fn test_segments_rejoin_to_exact_text() {
        let texts = [
            sample_text(),
            format!("{}. {}", "a".repeat(34), "b".repeat(30)),
            format!("  leading\n\n{}  trailing  \n", "word ".repeat(40)),
            format!("{}{}", "a".repeat(40), " ".repeat(40)),
            "é".repeat(100),
        ];
        for text in &texts {
            for (chunk, overlap) in [(10, 0), (10, 2), (25, 5), (7, 6), (1000, 10)] {
                let config = fixed(chunk, overlap);
                let segments = engine().chunk(text, &config).unwrap();
                assert!(!segments.is_empty());
                assert_eq!(&rejoin(&segments, &config), text, "chunk={chunk} overlap={overlap}");

                let sliding = config.with_strategy(ChunkStrategy::SlidingWindow);
                assert_eq!(engine().chunk(text, &sliding).unwrap(), segments);
            }
        }
    }

    #[test]
    fn test_fixed_size_boundedness() {
        let text = sample_text();
        let config = fixed(20, 4);
        for segment in engine().chunk(&text, &config).unwrap() {
            assert!(segment.chars().count() <= 80);
            assert!(approximate_tokens(&segment) <= config.chunk_size_tokens);
        }
    }

    #[test]
    fn test_starts_strictly_increase() {
        let text = "x".repeat(1000);
        let spans = fixed_size_spans(&text, &fixed(10, 9));
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
        // 40-char windows stepping by 4 chars.
        assert_eq!(spans[1].start, 4);
    }

    #[test]
    fn test_snaps_to_sentence_boundary() {
        // Window of 40 chars; ". " sits at char 34, past 70% (28).
        let text = format!("{}. {}", "a".repeat(34), "b".repeat(30));
        let spans = fixed_size_spans(&text, &fixed(10, 0));
        assert_eq!(&text[spans[0].clone()], format!("{}. ", "a".repeat(34)));

        let segments = engine().chunk(&text, &fixed(10, 0)).unwrap();
        assert_eq!(segments, vec![format!("{}. ", "a".repeat(34)), "b".repeat(30)]);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_early_boundary_ignored() {
        // ". " at char 5 is before 70% of the window, so the cut is hard.
        let text = format!("aaaaa. {}", "b".repeat(60));
        let spans = fixed_size_spans(&text, &fixed(10, 0));
        assert_eq!(spans[0], 0..40);
    }

    #[test]
    fn test_marker_priority() {
        // A newline later in the window loses to an eligible ". ".
        let text = format!("{}. {}\n{}", "a".repeat(30), "b".repeat(5), "c".repeat(40));
        let spans = fixed_size_spans(&text, &fixed(10, 0));
        assert_eq!(spans[0].end, 32);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "é".repeat(100);
        let config = fixed(5, 1);
        let spans = fixed_size_spans(&text, &config);
        assert_eq!(reconstruct(&text, &spans), text);
        for segment in engine().chunk(&text, &config).unwrap() {
            assert!(segment.chars().count() <= 20);
        }
    }

    #[test]
    fn test_whitespace_is_kept() {
        let text = format!("{}{}", "a".repeat(40), " ".repeat(40));
        let segments = engine().chunk(&text, &fixed(10, 0)).unwrap();
        assert_eq!(segments, vec!["a".repeat(40), " ".repeat(40)]);
        assert!(engine().chunk("", &fixed(10, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_sliding_window_matches_fixed_size() {
        let text = sample_text();
        let base = fixed(15, 3);
        let sliding = base.clone().with_strategy(ChunkStrategy::SlidingWindow);
        assert_eq!(
            engine().chunk(&text, &base).unwrap(),
            engine().chunk(&text, &sliding).unwrap()
        );
    }

    #[test]
    fn test_semantic_packing_with_carry_forward() {
        // Each paragraph is 4 tokens (16 chars).
        let paragraphs = ["aaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbb", "cccccccccccccccc", "dddddddddddddddd"];
        let text = paragraphs.join("\n\n");
        let config = fixed(8, 0).with_strategy(ChunkStrategy::Semantic);

        let segments = engine().chunk(&text, &config).unwrap();
        assert_eq!(
            segments,
            vec![
                format!("{}\n\n{}", paragraphs[0], paragraphs[1]),
                format!("{}\n\n{}", paragraphs[1], paragraphs[2]),
                format!("{}\n\n{}", paragraphs[2], paragraphs[3]),
            ]
        );
    }

    #[test]
    fn test_semantic_single_segment_when_small() {
        let text = "one\n\ntwo\n\nthree";
        let config = fixed(100, 0).with_strategy(ChunkStrategy::Semantic);
        assert_eq!(engine().chunk(text, &config).unwrap(), vec![text.to_string()]);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let config: ChunkingConfig =
            serde_json::from_str(r#"{"strategy": "recursive", "aggregation": "median"}"#).unwrap();
        assert_eq!(config.strategy, ChunkStrategy::FixedSize);
        assert_eq!(config.aggregation, Aggregation::Concatenate);
        assert_eq!(config.chunk_size_tokens, 8000);
        assert_eq!(config.overlap_tokens, 500);
        assert!(config.enabled);
    }

    #[test]
    fn test_config_aliases() {
        let config: ChunkingConfig = serde_json::from_str(
            r#"{"chunk_size": 100, "overlap": 10, "strategy": "semantic", "aggregation": "majority_vote"}"#,
        )
        .unwrap();
        assert_eq!(config.chunk_size_tokens, 100);
        assert_eq!(config.overlap_tokens, 10);
        assert_eq!(config.strategy, ChunkStrategy::Semantic);
        assert_eq!(config.aggregation, Aggregation::MajorityVote);
    }
}
