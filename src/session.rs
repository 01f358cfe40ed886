//! Profiling session
//!
//! A [`ProfilerSession`] is the single owner of one site's trace list. Every
//! event that changes it (navigation, a finished request, a flush) goes
//! through `&mut self`, and the store is written right after each change.

use crate::apex_log::{request_identifier, LogIndex};
use crate::capture::{self, Capture, DiscardReason};
use crate::correlator::{self, Placement};
use crate::har::HarEntry;
use crate::store::TraceStore;
use crate::trace::{self, Trace};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use url::Url;

/// What happened to one finished request
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Not an Apex action request
    Ignored,
    /// Apex request dropped before correlation
    Discarded(DiscardReason),
    /// Correlated into the current trace
    Recorded {
        request_id: String,
        placement: Placement,
        logs: usize,
    },
}

/// Result of [`ProfilerSession::flush`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Traces dropped from the store
    pub traces: usize,
    /// Request identifiers whose logs were purged
    pub request_identifiers: Vec<String>,
    /// Logs the log index reported as deleted
    pub logs_purged: usize,
}

/// Owner of one site's trace list and the store it is persisted to
pub struct ProfilerSession<S: TraceStore> {
    store: S,
    domain: String,
    page: Url,
    traces: Vec<Trace>,
    log_index: Option<Box<dyn LogIndex>>,
    trace_active_until: Option<DateTime<Utc>>,
}

impl<S: TraceStore> ProfilerSession<S> {
    /// Start profiling `page`, resuming the stored trace list of its domain
    pub fn open(store: S, page: Url) -> Result<Self> {
        let domain = domain_of(&page)?;
        let traces = store
            .load(&domain)
            .with_context(|| format!("Failed to load traces for {}", domain))?;

        let mut session = Self {
            store,
            domain,
            page,
            traces,
            log_index: None,
            trace_active_until: None,
        };
        session.start_trace_for_page()?;
        Ok(session)
    }

    /// Attach Apex debug logs to calls while the trace flag is active
    ///
    /// `active_until` is the trace flag expiration; `None` means no flag.
    pub fn with_log_index(
        mut self,
        index: Box<dyn LogIndex>,
        active_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.log_index = Some(index);
        self.trace_active_until = active_until;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn page(&self) -> &Url {
        &self.page
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The trace new calls are recorded into
    pub fn current_trace(&self) -> Option<&Trace> {
        self.traces.last()
    }

    /// The inspected page moved to `page`
    pub fn navigate(&mut self, page: Url) -> Result<()> {
        let domain = domain_of(&page)?;
        if domain != self.domain {
            tracing::info!(from = %self.domain, to = %domain, "switching site");
            self.traces = self
                .store
                .load(&domain)
                .with_context(|| format!("Failed to load traces for {}", domain))?;
            self.domain = domain;
        }
        self.page = page;
        self.start_trace_for_page()
    }

    /// Handle one finished network request
    ///
    /// `body` is the response text and `end_time` the moment it was read.
    pub fn record(
        &mut self,
        entry: &HarEntry,
        body: Option<&str>,
        end_time: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let call = match capture::classify(entry, body, end_time) {
            Capture::Ignored => return Ok(RecordOutcome::Ignored),
            Capture::Discarded(reason) => {
                tracing::warn!(url = %entry.request.url, %reason, "discarding unexpected Apex request");
                return Ok(RecordOutcome::Discarded(reason));
            }
            Capture::Captured(call) => call,
        };

        let call = if self.trace_flag_active(call.end_time()) {
            match self.log_index.as_mut() {
                Some(index) => {
                    let identifier = request_identifier(call.request_id());
                    let logs = index.log_ids(&identifier)?;
                    call.with_logs(logs)
                }
                None => call,
            }
        } else {
            call
        };

        let request_id = call.request_id().to_string();
        let logs = call.logs().len();
        // open, navigate and flush all leave a trace for the current page
        let placement = self
            .traces
            .last_mut()
            .context("Trace list is empty")?
            .record(call);
        tracing::debug!(%request_id, ?placement, logs, "recorded Apex call");

        self.persist()?;
        Ok(RecordOutcome::Recorded {
            request_id,
            placement,
            logs,
        })
    }

    /// Drop every trace of the domain and purge the related debug logs
    pub fn flush(&mut self) -> Result<FlushSummary> {
        let request_identifiers: Vec<String> = self
            .traces
            .iter()
            .flat_map(|trace| correlator::all_nodes(&trace.stack))
            .map(|call| request_identifier(call.request_id()))
            .collect();

        let logs_purged = match self.log_index.as_mut() {
            Some(index) if !request_identifiers.is_empty() => index.purge(&request_identifiers)?,
            _ => 0,
        };

        self.store
            .remove(&self.domain)
            .with_context(|| format!("Failed to remove traces for {}", self.domain))?;
        let summary = FlushSummary {
            traces: self.traces.len(),
            request_identifiers,
            logs_purged,
        };
        tracing::info!(
            domain = %self.domain,
            traces = summary.traces,
            logs = summary.logs_purged,
            "flushed traces"
        );

        self.traces.clear();
        self.start_trace_for_page()?;
        Ok(summary)
    }

    fn trace_flag_active(&self, at: DateTime<Utc>) -> bool {
        self.trace_active_until.is_some_and(|until| until >= at)
    }

    fn start_trace_for_page(&mut self) -> Result<()> {
        let url = trace::trace_url(&self.page);
        if trace::ensure_current(&mut self.traces, &url) {
            tracing::info!(domain = %self.domain, %url, "new trace");
        }
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        self.store
            .save(&self.domain, &self.traces)
            .with_context(|| format!("Failed to save traces for {}", self.domain))
    }
}

fn domain_of(page: &Url) -> Result<String> {
    page.host_str()
        .map(str::to_string)
        .with_context(|| format!("Page URL has no host: {}", page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apex_log::StaticLogIndex;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn page(path: &str) -> Url {
        Url::parse(&format!("https://acme.my.site.com{}", path)).unwrap()
    }

    #[test]
    fn test_open_starts_trace_and_persists() {
        let session = ProfilerSession::open(MemoryStore::new(), page("/s/")).unwrap();
        assert_eq!(session.domain(), "acme.my.site.com");
        assert_eq!(session.traces().len(), 1);
        assert_eq!(session.current_trace().unwrap().url, "/s/");
        assert!(session.store().contains("acme.my.site.com"));
    }

    #[test]
    fn test_open_resumes_stored_traces() {
        let mut store = MemoryStore::new();
        store
            .save("acme.my.site.com", &[Trace::new("/s/"), Trace::new("/s/cases")])
            .unwrap();

        let session = ProfilerSession::open(store.clone(), page("/s/cases")).unwrap();
        assert_eq!(session.traces().len(), 2);

        let session = ProfilerSession::open(store, page("/s/")).unwrap();
        assert_eq!(session.traces().len(), 3);
    }

    #[test]
    fn test_navigate_to_other_domain_switches_list() {
        let mut session = ProfilerSession::open(MemoryStore::new(), page("/s/")).unwrap();
        session
            .navigate(Url::parse("https://other.my.site.com/s/").unwrap())
            .unwrap();
        assert_eq!(session.domain(), "other.my.site.com");
        assert_eq!(session.traces().len(), 1);
        assert!(session.store().contains("acme.my.site.com"));
        assert!(session.store().contains("other.my.site.com"));
    }

    #[test]
    fn test_rejects_page_without_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert!(ProfilerSession::open(MemoryStore::new(), url).is_err());
    }

    #[test]
    fn test_trace_flag_window() {
        let until = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let session = ProfilerSession::open(MemoryStore::new(), page("/s/"))
            .unwrap()
            .with_log_index(Box::new(StaticLogIndex::new(BTreeMap::new())), Some(until));
        assert!(session.trace_flag_active(until));
        assert!(!session.trace_flag_active(until + chrono::Duration::seconds(1)));

        let no_flag = ProfilerSession::open(MemoryStore::new(), page("/s/"))
            .unwrap()
            .with_log_index(Box::new(StaticLogIndex::new(BTreeMap::new())), None);
        assert!(!no_flag.trace_flag_active(until));
    }

    #[test]
    fn test_trace_list_never_empty() {
        let mut session = ProfilerSession::open(MemoryStore::new(), page("/s/")).unwrap();
        assert!(session.current_trace().is_some());

        session.flush().unwrap();
        assert_eq!(session.current_trace().unwrap().url, "/s/");

        session
            .navigate(Url::parse("https://other.my.site.com/s/cases").unwrap())
            .unwrap();
        assert_eq!(session.current_trace().unwrap().url, "/s/cases");

        session.flush().unwrap();
        assert_eq!(session.traces().len(), 1);
        assert_eq!(session.store().load("other.my.site.com").unwrap().len(), 1);
    }

    #[test]
    fn test_flush_on_empty_session() {
        let mut session = ProfilerSession::open(MemoryStore::new(), page("/s/")).unwrap();
        let summary = session.flush().unwrap();
        assert_eq!(summary.traces, 1);
        assert!(summary.request_identifiers.is_empty());
        assert_eq!(summary.logs_purged, 0);
        assert_eq!(session.traces().len(), 1);
    }
}
