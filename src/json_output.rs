//! JSON output format for trace lists
//!
//! `--format json` emits one `xp-profiler-json-v1` document per run.

use crate::trace::Trace;
use serde::{Deserialize, Serialize};

/// Summary statistics for a replay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Calls at every depth across all traces
    pub total_calls: usize,
    /// Calls that ended up as roots
    pub root_calls: usize,
    /// Deepest call chain
    pub max_depth: usize,
    /// Requests that were not Apex actions
    pub ignored: usize,
    /// Apex requests dropped as malformed
    pub discarded: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Site domain the traces belong to
    pub domain: String,
    /// Traces, oldest page first
    pub traces: Vec<Trace>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "xp-profiler-json-v1".to_string(),
            domain: domain.into(),
            traces: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    /// Replace the traces and refresh the call counts
    pub fn set_traces(&mut self, traces: &[Trace]) {
        self.traces = traces.to_vec();
        self.summary.total_calls = traces.iter().map(Trace::call_count).sum();
        self.summary.root_calls = traces.iter().map(|t| t.stack.len()).sum();
        self.summary.max_depth = traces.iter().map(Trace::max_depth).max().unwrap_or(0);
    }

    pub fn set_skipped(&mut self, ignored: usize, discarded: usize) {
        self.summary.ignored = ignored;
        self.summary.discarded = discarded;
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captured_call::CapturedCall;
    use chrono::DateTime;

    fn call(id: &str, start: i64, end: i64) -> CapturedCall {
        CapturedCall::new(
            id,
            DateTime::from_timestamp_millis(start).unwrap(),
            DateTime::from_timestamp_millis(end).unwrap(),
        )
    }

    #[test]
    fn test_json_output_creation() {
        let output = JsonOutput::new("acme.test");
        assert_eq!(output.format, "xp-profiler-json-v1");
        assert_eq!(output.domain, "acme.test");
        assert!(output.traces.is_empty());
        assert_eq!(output.summary.total_calls, 0);
    }

    #[test]
    fn test_summary_counts_nested_calls() {
        let mut trace = Trace::new("/s/");
        trace.record(call("a", 0, 5));
        trace.record(call("b", 6, 8));
        trace.record(call("c", 7, 9));
        let mut output = JsonOutput::new("acme.test");
        output.set_traces(&[trace, Trace::new("/s/cases")]);
        output.set_skipped(4, 1);

        assert_eq!(output.summary.total_calls, 3);
        assert_eq!(output.summary.root_calls, 1);
        assert_eq!(output.summary.max_depth, 2);
        assert_eq!(output.summary.ignored, 4);
        assert_eq!(output.summary.discarded, 1);
    }

    #[test]
    fn test_json_serialization() {
        let mut trace = Trace::new("/s/");
        trace.record(call("a", 0, 5));
        let mut output = JsonOutput::new("acme.test");
        output.set_traces(&[trace]);

        let json = output.to_json().unwrap();
        assert!(json.contains("\"format\": \"xp-profiler-json-v1\""));
        assert!(json.contains("\"requestId\": \"a\""));
        assert!(json.contains("\"url\": \"/s/\""));
    }
}
