use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xp_profiler::apex_log::StaticLogIndex;
use xp_profiler::cli::{Cli, OutputFormat};
use xp_profiler::har::HarFile;
use xp_profiler::json_output::JsonOutput;
use xp_profiler::render;
use xp_profiler::replay::{self, ReplayConfig, ReplayReport};
use xp_profiler::session::ProfilerSession;
use xp_profiler::store::{JsonFileStore, MemoryStore, TraceStore};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print the traces and the replay counters in the requested format
fn print_report<S: TraceStore>(
    session: &ProfilerSession<S>,
    report: &ReplayReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if let Some(flushed) = &report.flushed {
                println!(
                    "Flushed {} trace(s), purged {} log(s)",
                    flushed.traces, flushed.logs_purged
                );
            }
            println!("=== {} ===", session.domain());
            println!();
            print!("{}", render::render_traces(session.traces()));
            println!(
                "{} recorded, {} ignored, {} discarded",
                report.recorded, report.ignored, report.discarded
            );
        }
        OutputFormat::Json => {
            let mut output = JsonOutput::new(session.domain());
            output.set_traces(session.traces());
            output.set_skipped(report.ignored, report.discarded);
            println!("{}", output.to_json()?);
        }
    }
    Ok(())
}

/// Open a session on `store`, replay the HAR and print the result
fn run<S: TraceStore>(store: S, har: &HarFile, args: &Cli) -> Result<()> {
    let page = replay::initial_page(har, args.page_url.as_ref())?;
    let mut session = ProfilerSession::open(store, page)?;

    if let Some(path) = &args.logs {
        let index = StaticLogIndex::from_file(path)?;
        let active_until = args.trace_active_until.unwrap_or(DateTime::<Utc>::MAX_UTC);
        session = session.with_log_index(Box::new(index), Some(active_until));
    }

    let config = ReplayConfig {
        flush_first: args.flush,
    };
    let report = replay::replay(har, &mut session, &config)?;
    print_report(&session, &report, args.format)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let har = HarFile::from_file(&args.har)?;

    match &args.store_dir {
        Some(dir) => run(JsonFileStore::open(dir)?, &har, &args),
        None => run(MemoryStore::new(), &har, &args),
    }
}
