//! Text rendering of trace lists
//!
//! ```text
//! === /s/account/001 (3 calls) ===
//! APEX req-1 [10:00:00.000, 42ms]
//!   AccountController.list  total=20ms db=3ms
//!   └─ APEX req-2 [10:00:00.060, 15ms]
//!        CaseController.open  total=9ms db=-
//! ```

use crate::captured_call::CapturedCall;
use crate::trace::Trace;
use std::fmt::Write;

/// Render every trace, most recent page last
pub fn render_traces(traces: &[Trace]) -> String {
    let mut out = String::new();
    for trace in traces {
        render_trace(&mut out, trace);
    }
    out
}

fn render_trace(out: &mut String, trace: &Trace) {
    let _ = writeln!(out, "=== {} ({} calls) ===", trace.url, trace.call_count());
    if trace.is_empty() {
        let _ = writeln!(out, "(no Apex requests)");
    }
    for call in &trace.stack {
        render_call(out, call, 0);
    }
    out.push('\n');
}

fn render_call(out: &mut String, call: &CapturedCall, depth: usize) {
    let indent = "  ".repeat(depth);
    let branch = if depth == 0 { "" } else { "└─ " };
    let _ = writeln!(
        out,
        "{}{}{} {} [{}, {}ms]",
        indent,
        branch,
        call.name(),
        call.request_id(),
        call.start_time().format("%H:%M:%S%.3f"),
        call.duration_ms()
    );

    let detail_indent = if depth == 0 {
        "  ".to_string()
    } else {
        format!("{}     ", indent)
    };
    for item in call.items() {
        let _ = writeln!(
            out,
            "{}{}  total={} db={}",
            detail_indent,
            item.name,
            millis(item.total),
            millis(item.db)
        );
    }
    if !call.logs().is_empty() {
        let _ = writeln!(out, "{}logs: {}", detail_indent, call.logs().join(", "));
    }

    for child in call.children() {
        render_call(out, child, depth + 1);
    }
}

fn millis(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{}ms", ms),
        None => "-".to_string(),
    }
}
