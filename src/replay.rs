//! HAR replay
//!
//! Feeds the entries of a HAR export through a [`ProfilerSession`] one by
//! one, in file order, as the DevTools panel would have seen them.

use crate::har::{HarEntry, HarFile};
use crate::session::{FlushSummary, ProfilerSession, RecordOutcome};
use crate::store::TraceStore;
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use url::Url;

/// Replay settings
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Flush stored traces before the first entry
    pub flush_first: bool,
}

/// Counters of one replay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub recorded: usize,
    pub ignored: usize,
    pub discarded: usize,
    pub navigations: usize,
    pub flushed: Option<FlushSummary>,
}

/// Page the session starts on
///
/// An explicit URL wins, then the first HAR page whose title is a URL, then
/// the URL of the first entry.
pub fn initial_page(har: &HarFile, explicit: Option<&Url>) -> Result<Url> {
    if let Some(url) = explicit {
        return Ok(url.clone());
    }
    if let Some(url) = har.log.pages.iter().find_map(|p| page_url(&p.title)) {
        return Ok(url);
    }
    if let Some(url) = har.log.entries.iter().find_map(|e| page_url(&e.request.url)) {
        return Ok(url);
    }
    bail!("Cannot tell which page the HAR was captured on; pass --page-url")
}

/// When the response of `entry` was fully read: start plus elapsed time
///
/// An elapsed time past the representable range leaves the end at the start.
pub fn end_time(entry: &HarEntry) -> DateTime<Utc> {
    let start = DateTime::parse_from_rfc3339(&entry.started_date_time)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default();
    let elapsed = if entry.time.is_finite() && entry.time > 0.0 {
        Duration::microseconds((entry.time * 1000.0).round() as i64)
    } else {
        Duration::zero()
    };
    start.checked_add_signed(elapsed).unwrap_or(start)
}

/// Replay every entry of `har` into `session`
pub fn replay<S: TraceStore>(
    har: &HarFile,
    session: &mut ProfilerSession<S>,
    config: &ReplayConfig,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    if config.flush_first {
        report.flushed = Some(session.flush()?);
    }

    let mut current_page: Option<&str> = None;
    for entry in &har.log.entries {
        if let Some(pageref) = entry.pageref.as_deref() {
            if current_page.is_some_and(|p| p != pageref) {
                if let Some(url) = har.page(pageref).and_then(|p| page_url(&p.title)) {
                    session.navigate(url)?;
                    report.navigations += 1;
                } else {
                    tracing::debug!(pageref, "page title is not a URL, staying on current trace");
                }
            }
            current_page = Some(pageref);
        }

        let body = entry.response.content.plain_text();
        match session.record(entry, body, end_time(entry))? {
            RecordOutcome::Recorded { .. } => report.recorded += 1,
            RecordOutcome::Ignored => report.ignored += 1,
            RecordOutcome::Discarded(_) => report.discarded += 1,
        }
    }

    tracing::info!(
        recorded = report.recorded,
        ignored = report.ignored,
        discarded = report.discarded,
        "replay finished"
    );
    Ok(report)
}

fn page_url(raw: &str) -> Option<Url> {
    Url::parse(raw).ok().filter(|url| url.host_str().is_some())
}
