//! Apex request capture
//!
//! Turns a finished network request into a [`CapturedCall`], or into an
//! explicit decision not to: requests that are not Aura Apex actions are
//! ignored, and Apex requests with a missing or malformed part are
//! discarded with a [`DiscardReason`]. Nothing malformed ever reaches the
//! correlator.

use crate::captured_call::{ApexActionMetric, CapturedCall};
use crate::har::HarEntry;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Path fragment of Experience Cloud Aura endpoints
pub const AURA_ENDPOINT: &str = "s/sfsites/aura";
/// Query parameter Aura adds to Apex action requests
pub const APEX_ACTION_QUERY: &str = "aura.ApexAction.execute";
/// Request header carrying the Salesforce request id
pub const REQUEST_ID_HEADER: &str = "x-sfdc-request-id";
/// Form parameter holding the URL-encoded action message
pub const MESSAGE_PARAM: &str = "message";
/// Descriptor of actions that execute an Apex method
pub const APEX_EXECUTE_DESCRIPTOR: &str = "aura://ApexActionController/ACTION$execute";

/// Outcome of looking at one finished request
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Not an Aura Apex action request
    Ignored,
    /// An Apex action request that could not be turned into a call
    Discarded(DiscardReason),
    /// A call ready for correlation
    Captured(CapturedCall),
}

/// Why an Apex action request was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    #[error("request has no `message` form parameter")]
    MissingMessage,

    #[error("request has no x-sfdc-request-id header")]
    MissingRequestId,

    #[error("response body is missing")]
    MissingBody,

    #[error("response body is not an Aura perf summary: {0}")]
    UnparseableBody(String),

    #[error("action message is malformed: {0}")]
    MalformedMessage(String),

    #[error("invalid startedDateTime {0:?}")]
    InvalidStartTime(String),

    #[error("request ends before it starts ({start} > {end})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Debug, Deserialize)]
struct AuraMessage {
    actions: Vec<AuraAction>,
}

#[derive(Debug, Deserialize)]
struct AuraAction {
    id: String,
    descriptor: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuraResponse {
    perf_summary: PerfSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerfSummary {
    #[serde(default)]
    actions_total: serde_json::Value,
    #[serde(default)]
    actions: HashMap<String, ActionTiming>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct ActionTiming {
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    db: Option<f64>,
}

/// Whether the request targets the Aura endpoint with an Apex action
pub fn is_apex_action(entry: &HarEntry) -> bool {
    entry.request.url.contains(AURA_ENDPOINT) && entry.request.has_query_param(APEX_ACTION_QUERY)
}

/// Classify a finished request
///
/// `body` is the response text as read after completion, `end_time` the
/// moment it was fully read.
pub fn classify(entry: &HarEntry, body: Option<&str>, end_time: DateTime<Utc>) -> Capture {
    if !is_apex_action(entry) {
        return Capture::Ignored;
    }
    match build_call(entry, body, end_time) {
        Ok(call) => Capture::Captured(call),
        Err(reason) => Capture::Discarded(reason),
    }
}

fn build_call(
    entry: &HarEntry,
    body: Option<&str>,
    end_time: DateTime<Utc>,
) -> Result<CapturedCall, DiscardReason> {
    let message = entry
        .request
        .post_param(MESSAGE_PARAM)
        .filter(|m| !m.is_empty())
        .ok_or(DiscardReason::MissingMessage)?;
    let request_id = entry
        .request
        .header(REQUEST_ID_HEADER)
        .filter(|id| !id.is_empty())
        .ok_or(DiscardReason::MissingRequestId)?;

    let body = body.ok_or(DiscardReason::MissingBody)?;
    let response: AuraResponse = serde_json::from_str(body)
        .map_err(|e| DiscardReason::UnparseableBody(e.to_string()))?;

    let message = parse_message(message)?;

    let start_time = DateTime::parse_from_rfc3339(&entry.started_date_time)
        .map_err(|_| DiscardReason::InvalidStartTime(entry.started_date_time.clone()))?
        .with_timezone(&Utc);
    if start_time > end_time {
        return Err(DiscardReason::InvalidTimeRange {
            start: start_time,
            end: end_time,
        });
    }

    let items = message
        .actions
        .iter()
        .filter(|action| action.descriptor == APEX_EXECUTE_DESCRIPTOR)
        .map(|action| action_metric(action, &response.perf_summary))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CapturedCall::new(request_id, start_time, end_time)
        .with_summary(response.perf_summary.actions_total)
        .with_items(items))
}

fn parse_message(raw: &str) -> Result<AuraMessage, DiscardReason> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| DiscardReason::MalformedMessage(e.to_string()))?
        .to_string();
    serde_json::from_str(&decoded).map_err(|e| DiscardReason::MalformedMessage(e.to_string()))
}

fn action_metric(
    action: &AuraAction,
    perf: &PerfSummary,
) -> Result<ApexActionMetric, DiscardReason> {
    let param = |key: &str| {
        action.params.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
            DiscardReason::MalformedMessage(format!("action {} has no `{}` param", action.id, key))
        })
    };
    let classname = param("classname")?;
    let method = param("method")?;
    let timing = perf.actions.get(&action.id).copied().unwrap_or_default();

    Ok(ApexActionMetric {
        id: action.id.clone(),
        name: format!("{}.{}", classname, method),
        total: timing.total,
        db: timing.db,
    })
}
