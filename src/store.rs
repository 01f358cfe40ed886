//! Trace list persistence
//!
//! Trace lists are stored per site domain under the key
//! `traceList.<domain>`. The session saves after every change.

use crate::trace::Trace;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving trace lists
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid domain for storage key: {0:?}")]
    InvalidDomain(String),

    #[error("Failed to decode stored traces at {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode traces: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage key of a domain's trace list
pub fn storage_key(domain: &str) -> String {
    format!("traceList.{}", domain)
}

/// Persistence for per-domain trace lists
pub trait TraceStore {
    /// Load the trace list of `domain`; an unknown domain has none
    fn load(&self, domain: &str) -> Result<Vec<Trace>>;

    /// Replace the stored trace list of `domain`
    fn save(&mut self, domain: &str, traces: &[Trace]) -> Result<()>;

    /// Forget the trace list of `domain`; unknown domains are fine
    fn remove(&mut self, domain: &str) -> Result<()>;
}

/// Keeps trace lists in memory only
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    lists: HashMap<String, Vec<Trace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.lists.contains_key(&storage_key(domain))
    }
}

impl TraceStore for MemoryStore {
    fn load(&self, domain: &str) -> Result<Vec<Trace>> {
        Ok(self
            .lists
            .get(&storage_key(domain))
            .cloned()
            .unwrap_or_default())
    }

    fn save(&mut self, domain: &str, traces: &[Trace]) -> Result<()> {
        self.lists.insert(storage_key(domain), traces.to_vec());
        Ok(())
    }

    fn remove(&mut self, domain: &str) -> Result<()> {
        self.lists.remove(&storage_key(domain));
        Ok(())
    }
}

/// One pretty-printed JSON file per domain: `<dir>/traceList.<domain>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Use `dir` for storage, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the trace list of `domain`
    pub fn path_for(&self, domain: &str) -> Result<PathBuf> {
        if domain.is_empty()
            || domain
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control())
            || domain.starts_with('.')
        {
            return Err(StoreError::InvalidDomain(domain.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", storage_key(domain))))
    }
}

impl TraceStore for JsonFileStore {
    fn load(&self, domain: &str) -> Result<Vec<Trace>> {
        let path = self.path_for(domain)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Decode { path, source })
    }

    fn save(&mut self, domain: &str, traces: &[Trace]) -> Result<()> {
        let path = self.path_for(domain)?;
        let json = serde_json::to_string_pretty(traces)?;
        std::fs::write(&path, json)?;
        tracing::trace!(path = %path.display(), traces = traces.len(), "saved trace list");
        Ok(())
    }

    fn remove(&mut self, domain: &str) -> Result<()> {
        let path = self.path_for(domain)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
