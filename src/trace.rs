//! Page traces
//!
//! A [`Trace`] collects the calls captured while one page URL was shown.
//! A site's trace list is the ordered history of those pages.

use crate::captured_call::CapturedCall;
use crate::correlator::{self, Placement};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Page address without the origin (path, query and fragment)
    pub url: String,
    /// Root calls of the forest
    #[serde(default)]
    pub stack: Vec<CapturedCall>,
}

impl Trace {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stack: Vec::new(),
        }
    }

    /// Correlate a call into this trace
    pub fn record(&mut self, call: CapturedCall) -> Placement {
        correlator::insert(call, &mut self.stack)
    }

    /// Number of calls at every depth
    pub fn call_count(&self) -> usize {
        correlator::all_nodes(&self.stack).len()
    }

    pub fn max_depth(&self) -> usize {
        self.stack.iter().map(CapturedCall::depth).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// The page address a trace is keyed by: `href` minus the origin
pub fn trace_url(page: &Url) -> String {
    let mut url = page.path().to_string();
    if let Some(query) = page.query() {
        url.push('?');
        url.push_str(query);
    }
    if let Some(fragment) = page.fragment() {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Make sure the last trace of `traces` belongs to `url`
///
/// Returns true when a new trace was started.
pub fn ensure_current(traces: &mut Vec<Trace>, url: &str) -> bool {
    match traces.last() {
        Some(last) if last.url == url => false,
        _ => {
            traces.push(Trace::new(url));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_url_strips_origin() {
        let page = Url::parse("https://acme.my.site.com/s/account/001?tab=detail#top").unwrap();
        assert_eq!(trace_url(&page), "/s/account/001?tab=detail#top");

        let root = Url::parse("https://acme.my.site.com").unwrap();
        assert_eq!(trace_url(&root), "/");
    }

    #[test]
    fn test_ensure_current_reuses_same_url() {
        let mut traces = Vec::new();
        assert!(ensure_current(&mut traces, "/s/"));
        assert!(!ensure_current(&mut traces, "/s/"));
        assert!(ensure_current(&mut traces, "/s/cases"));
        // Going back starts a new trace: only the last one is compared
        assert!(ensure_current(&mut traces, "/s/"));
        assert_eq!(traces.len(), 3);
    }

    #[test]
    fn test_empty_trace_counts() {
        let trace = Trace::new("/s/");
        assert!(trace.is_empty());
        assert_eq!(trace.call_count(), 0);
        assert_eq!(trace.max_depth(), 0);
    }
}
