//! Apex debug log lookup
//!
//! While a trace flag is active on the community user, Salesforce writes
//! one or more `ApexLog` records per request, keyed by the request
//! identifier `TID:<x-sfdc-request-id>`. The Salesforce API itself lives
//! outside this crate; [`LogIndex`] is the seam the session talks to.

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Prefix Salesforce uses for `ApexLog.RequestIdentifier`
pub const REQUEST_IDENTIFIER_PREFIX: &str = "TID:";

#[derive(Error, Debug)]
pub enum LogIndexError {
    #[error("Log lookup failed for {identifier}: {message}")]
    Lookup { identifier: String, message: String },

    #[error("Log purge failed: {0}")]
    Purge(String),
}

/// `ApexLog.RequestIdentifier` of a request id
pub fn request_identifier(request_id: &str) -> String {
    format!("{}{}", REQUEST_IDENTIFIER_PREFIX, request_id)
}

/// Source of Apex debug log ids
pub trait LogIndex {
    /// Ids of the logs recorded for one request identifier
    fn log_ids(&mut self, request_identifier: &str) -> Result<Vec<String>, LogIndexError>;

    /// Delete every log recorded for the given request identifiers,
    /// returning how many logs were removed
    fn purge(&mut self, request_identifiers: &[String]) -> Result<usize, LogIndexError>;
}

/// Log index backed by an exported map of request identifier to log ids
///
/// The JSON form is an object: `{"TID:abc": ["07L..."], ...}`.
#[derive(Debug, Default, Clone)]
pub struct StaticLogIndex {
    logs: BTreeMap<String, Vec<String>>,
}

impl StaticLogIndex {
    pub fn new(logs: BTreeMap<String, Vec<String>>) -> Self {
        Self { logs }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read log index {}", path.display()))?;
        let logs = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse log index {}", path.display()))?;
        Ok(Self { logs })
    }

    pub fn len(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogIndex for StaticLogIndex {
    fn log_ids(&mut self, request_identifier: &str) -> Result<Vec<String>, LogIndexError> {
        Ok(self
            .logs
            .get(request_identifier)
            .cloned()
            .unwrap_or_default())
    }

    fn purge(&mut self, request_identifiers: &[String]) -> Result<usize, LogIndexError> {
        let removed = request_identifiers
            .iter()
            .filter_map(|id| self.logs.remove(id))
            .map(|logs| logs.len())
            .sum();
        Ok(removed)
    }
}
