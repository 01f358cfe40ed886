//! CLI argument parsing for xp-profiler

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

/// Output format for the correlated traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented call tree (default)
    Text,
    /// JSON document for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "xp-profiler")]
#[command(version)]
#[command(
    about = "Correlate Experience Cloud Apex requests from a HAR export into call stacks",
    long_about = None
)]
pub struct Cli {
    /// HAR export of the DevTools network panel
    #[arg(long = "har", value_name = "FILE")]
    pub har: PathBuf,

    /// Page the capture starts on (defaults to the first HAR page)
    #[arg(long = "page-url", value_name = "URL", value_parser = Url::parse)]
    pub page_url: Option<Url>,

    /// Keep trace lists in this directory across runs
    #[arg(long = "store-dir", value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// JSON map of request identifiers (TID:...) to Apex debug log ids
    #[arg(long = "logs", value_name = "FILE")]
    pub logs: Option<PathBuf>,

    /// Trace flag expiration; logs are attached to calls ending before it
    #[arg(long = "trace-active-until", value_name = "RFC3339", requires = "logs")]
    pub trace_active_until: Option<DateTime<Utc>>,

    /// Flush stored traces (and purge their logs) before replaying
    #[arg(long = "flush")]
    pub flush: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging to stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}
