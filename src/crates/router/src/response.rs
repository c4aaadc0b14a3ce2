//! Route results and accounting.

use crate::aggregator::AggregatedResult;
use crate::chunking::Aggregation;
use llm::SegmentResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-segment breakdown entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentView {
    /// Position in chunk order.
    pub index: usize,
    pub content: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

/// Totals and routing details for one route call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    /// Sum of per-call latencies, not wall-clock time.
    pub total_latency_ms: u64,
    pub segment_count: usize,
    pub model: String,
    pub provider: String,
    pub binding_label: String,
    pub rule_name: String,
    pub aggregation: Aggregation,
    /// Caller-supplied metadata, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_metadata: Option<Value>,
}

/// Response of a successful route call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub result: AggregatedResult,
    pub metadata: RouteMetadata,
    pub segments: Vec<SegmentView>,
}

/// Running totals over segment results.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub segments: usize,
    pub tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

impl Usage {
    pub fn add(&mut self, result: &SegmentResult) {
        self.segments += 1;
        self.tokens += result.tokens_used;
        self.cost_usd += result.cost_usd;
        self.latency_ms += result.latency_ms;
    }

    pub fn sum(results: &[SegmentResult]) -> Self {
        let mut usage = Self::default();
        for result in results {
            usage.add(result);
        }
        usage
    }
}

impl SegmentView {
    fn from_result(index: usize, result: SegmentResult) -> Self {
        Self {
            index,
            content: result.content,
            tokens_used: result.tokens_used,
            cost_usd: result.cost_usd,
            latency_ms: result.latency_ms,
        }
    }
}

/// Everything about a route except its results.
pub(crate) struct RouteContext<'a> {
    pub binding_label: &'a str,
    pub rule_name: &'a str,
    pub model: &'a str,
    pub provider: &'a str,
    pub aggregation: Aggregation,
    pub request_metadata: Option<Value>,
}

impl RouteResponse {
    pub(crate) fn assemble(
        context: RouteContext<'_>,
        result: AggregatedResult,
        results: Vec<SegmentResult>,
    ) -> Self {
        let usage = Usage::sum(&results);
        let segments: Vec<SegmentView> = results
            .into_iter()
            .enumerate()
            .map(|(index, r)| SegmentView::from_result(index, r))
            .collect();

        Self {
            result,
            metadata: RouteMetadata {
                total_cost_usd: usage.cost_usd,
                total_tokens: usage.tokens,
                total_latency_ms: usage.latency_ms,
                segment_count: segments.len(),
                model: context.model.to_string(),
                provider: context.provider.to_string(),
                binding_label: context.binding_label.to_string(),
                rule_name: context.rule_name.to_string(),
                aggregation: context.aggregation,
                request_metadata: context.request_metadata,
            },
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(content: &str, tokens: u64, cost: f64, latency: u64) -> SegmentResult {
        SegmentResult {
            tokens_used: tokens,
            cost_usd: cost,
            latency_ms: latency,
            ..SegmentResult::text(content)
        }
    }

    #[test]
    fn test_assemble_totals() {
        let results = vec![result("a", 10, 0.5, 100), result("b", 5, 0.25, 40)];
        let response = RouteResponse::assemble(
            RouteContext {
                binding_label: "docs",
                rule_name: "summarize",
                model: "gpt-4o",
                provider: "openai",
                aggregation: Aggregation::Concatenate,
                request_metadata: Some(json!({"request_id": "r1"})),
            },
            AggregatedResult::Text("a\n\nb".into()),
            results,
        );

        assert_eq!(response.metadata.total_tokens, 15);
        assert_eq!(response.metadata.total_cost_usd, 0.75);
        assert_eq!(response.metadata.total_latency_ms, 140);
        assert_eq!(response.metadata.segment_count, 2);
        assert_eq!(response.segments[1].index, 1);
        assert_eq!(response.segments[1].content, "b");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"], "a\n\nb");
        assert_eq!(value["metadata"]["aggregation"], "concatenate");
        assert_eq!(value["metadata"]["request_metadata"]["request_id"], "r1");
    }

    #[test]
    fn test_request_metadata_omitted_when_absent() {
        let response = RouteResponse::assemble(
            RouteContext {
                binding_label: "b",
                rule_name: "r",
                model: "m",
                provider: "p",
                aggregation: Aggregation::AverageScore,
                request_metadata: None,
            },
            AggregatedResult::Number(2.0),
            vec![result("2", 1, 0.0, 1)],
        );
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["metadata"].get("request_metadata").is_none());
        assert_eq!(value["result"], 2.0);
    }
}
