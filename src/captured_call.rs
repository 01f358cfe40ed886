//! Captured Apex calls
//!
//! A [`CapturedCall`] is one Apex action request observed on the network,
//! together with the calls that were nested under it by the
//! [`correlator`](crate::correlator).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call category shown for every captured Aura Apex request
pub const APEX_CALL_NAME: &str = "APEX";

/// Server-side timing of one Apex action inside a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApexActionMetric {
    /// Aura action id (e.g. "123;a")
    pub id: String,
    /// Controller and method, "Classname.method"
    pub name: String,
    /// Total server time in milliseconds, when the response reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Database time in milliseconds, when the response reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<f64>,
}

/// One node of the call forest
///
/// The request id and the start/end timestamps are fixed at construction.
/// Children are only ever appended, by the correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedCall {
    name: String,
    request_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// Opaque `perfSummary.actionsTotal` object
    #[serde(default)]
    summary: serde_json::Value,
    #[serde(default)]
    items: Vec<ApexActionMetric>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    children: Vec<CapturedCall>,
}

impl CapturedCall {
    /// Create a childless call with no attached logs
    pub fn new(
        request_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            name: APEX_CALL_NAME.to_string(),
            request_id: request_id.into(),
            start_time,
            end_time,
            summary: serde_json::Value::Null,
            items: Vec::new(),
            logs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attach the `perfSummary.actionsTotal` object
    pub fn with_summary(mut self, summary: serde_json::Value) -> Self {
        self.summary = summary;
        self
    }

    /// Attach the per-action metrics
    pub fn with_items(mut self, items: Vec<ApexActionMetric>) -> Self {
        self.items = items;
        self
    }

    /// Attach Apex debug log ids
    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn summary(&self) -> &serde_json::Value {
        &self.summary
    }

    pub fn items(&self) -> &[ApexActionMetric] {
        &self.items
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn children(&self) -> &[CapturedCall] {
        &self.children
    }

    /// Wall-clock duration as seen by the browser, in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    /// Depth of the deepest chain below (and including) this node
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CapturedCall::depth)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<CapturedCall> {
        &mut self.children
    }
}
