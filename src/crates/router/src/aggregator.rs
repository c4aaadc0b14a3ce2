//! Merging per-segment model outputs into one result.

use crate::chunking::Aggregation;
use llm::SegmentResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

const JOIN_SEPARATOR: &str = "\n\n";

/// Final value of a route: text for most strategies, a number for
/// `average_score` when at least one segment parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregatedResult {
    Number(f64),
    Text(String),
}

impl AggregatedResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AggregatedResult::Text(s) => Some(s),
            AggregatedResult::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AggregatedResult::Number(n) => Some(*n),
            AggregatedResult::Text(_) => None,
        }
    }
}

impl fmt::Display for AggregatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatedResult::Number(n) => write!(f, "{}", n),
            AggregatedResult::Text(s) => f.write_str(s),
        }
    }
}

/// Reduces ordered segment results. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, results: &[SegmentResult], strategy: Aggregation) -> AggregatedResult {
        if results.is_empty() {
            return AggregatedResult::Text(String::new());
        }

        match strategy {
            Aggregation::Concatenate => concatenate(results),
            Aggregation::MajorityVote => majority_vote(results),
            Aggregation::AverageScore => average_score(results),
        }
    }
}

fn concatenate(results: &[SegmentResult]) -> AggregatedResult {
    let joined = results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR);
    AggregatedResult::Text(joined)
}

/// Most frequent trimmed content; ties go to the value seen first.
fn majority_vote(results: &[SegmentResult]) -> AggregatedResult {
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in results {
        let vote = result.content.trim();
        match index.get(vote) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(vote, order.len());
                order.push((vote, 1));
            }
        }
    }

    let mut winner = ("", 0);
    for &(vote, count) in &order {
        if count > winner.1 {
            winner = (vote, count);
        }
    }
    AggregatedResult::Text(winner.0.to_string())
}

/// Mean of the contents that parse as numbers. Unparseable contents are
/// skipped; when none parse the contents are concatenated instead.
fn average_score(results: &[SegmentResult]) -> AggregatedResult {
    let scores: Vec<f64> = results
        .iter()
        .filter_map(|r| r.content.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .collect();

    if scores.is_empty() {
        debug!(
            segments = results.len(),
            "no numeric scores, falling back to concatenate"
        );
        return concatenate(results);
    }

    let skipped = results.len() - scores.len();
    if skipped > 0 {
        debug!(skipped, "ignoring non-numeric segment scores");
    }

    // Running mean stays finite for any finite inputs.
    let mean = scores
        .iter()
        .enumerate()
        .fold(0.0, |mean, (i, score)| mean + (score - mean) / (i + 1) as f64);
    AggregatedResult::Number(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(contents: &[&str]) -> Vec<SegmentResult> {
        contents.iter().map(|c| SegmentResult::text(*c)).collect()
    }

    fn aggregate(contents: &[&str], strategy: Aggregation) -> AggregatedResult {
        ResultAggregator::new().aggregate(&results(contents), strategy)
    }

    #[test]
    fn test_empty_input() {
        for strategy in [
            Aggregation::Concatenate,
            Aggregation::MajorityVote,
            Aggregation::AverageScore,
        ] {
            assert_eq!(aggregate(&[], strategy), AggregatedResult::Text(String::new()));
        }
    }

    #[test]
    fn test_concatenate_preserves_order() {
        assert_eq!(
            aggregate(&["one", " two", "three "], Aggregation::Concatenate),
            AggregatedResult::Text("one\n\n two\n\nthree ".to_string())
        );
    }

    #[test]
    fn test_singletons() {
        assert_eq!(
            aggregate(&["only"], Aggregation::Concatenate).as_text(),
            Some("only")
        );
        assert_eq!(
            aggregate(&["only"], Aggregation::MajorityVote).as_text(),
            Some("only")
        );
        assert_eq!(
            aggregate(&["4.25"], Aggregation::AverageScore).as_number(),
            Some(4.25)
        );
    }

    #[test]
    fn test_average_ignores_non_finite_scores() {
        assert_eq!(
            aggregate(&["NaN", "4", "inf", "-infinity", "2"], Aggregation::AverageScore),
            AggregatedResult::Number(3.0)
        );
        // Nothing finite: concatenated instead.
        assert_eq!(
            aggregate(&["NaN", "inf"], Aggregation::AverageScore).as_text(),
            Some("NaN\n\ninf")
        );

        let huge = aggregate(&["1e308", "1e308"], Aggregation::AverageScore);
        assert_eq!(huge, AggregatedResult::Number(1e308));
        assert_eq!(serde_json::to_value(&huge).unwrap(), serde_json::json!(1e308));
    }

    #[test]
    fn test_majority_vote() {
        assert_eq!(
            aggregate(&["a", "b", "a"], Aggregation::MajorityVote).as_text(),
            Some("a")
        );
        assert_eq!(
            aggregate(&["b", "a", "a"], Aggregation::MajorityVote).as_text(),
            Some("a")
        );
    }

    #[test]
    fn test_majority_vote_tie_goes_to_first_seen() {
        assert_eq!(
            aggregate(&["a", "b"], Aggregation::MajorityVote).as_text(),
            Some("a")
        );
        assert_eq!(
            aggregate(&["b", "a", "a", "b"], Aggregation::MajorityVote).as_text(),
            Some("b")
        );
    }

    #[test]
    fn test_majority_vote_trims() {
        assert_eq!(
            aggregate(&[" positive\n", "negative", "positive"], Aggregation::MajorityVote)
                .as_text(),
            Some("positive")
        );
    }

    #[test]
    fn test_average_score() {
        let mean = aggregate(&["1", " 2.5 ", "3.5"], Aggregation::AverageScore)
            .as_number()
            .unwrap();
        assert!((mean - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_score_skips_unparseable() {
        assert_eq!(
            aggregate(&["not-a-number", "3.5"], Aggregation::AverageScore),
            AggregatedResult::Number(3.5)
        );
    }

    #[test]
    fn test_average_score_falls_back_to_concatenate() {
        assert_eq!(
            aggregate(&["x", "y"], Aggregation::AverageScore),
            AggregatedResult::Text("x\n\ny".to_string())
        );
    }

    #[test]
    fn test_result_serialization() {
        assert_eq!(
            serde_json::to_string(&AggregatedResult::Number(3.5)).unwrap(),
            "3.5"
        );
        assert_eq!(
            serde_json::to_string(&AggregatedResult::Text("hi".into())).unwrap(),
            "\"hi\""
        );
        assert_eq!(AggregatedResult::Text("hi".into()).to_string(), "hi");
    }
}
