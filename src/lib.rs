//! xp-profiler - Apex call-stack correlation for Experience Cloud sites
//!
//! This library turns the Aura Apex requests a browser made against a
//! Salesforce Experience Cloud site into nested call stacks, grouped per
//! page navigation, and keeps them per site across sessions.

pub mod apex_log;
pub mod capture;
pub mod captured_call;
pub mod cli;
pub mod correlator;
pub mod har;
pub mod json_output;
pub mod render;
pub mod replay;
pub mod session;
pub mod store;
pub mod trace;
