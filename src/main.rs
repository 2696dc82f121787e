use anyhow::Result;
use callpanel::{config::default_jobs, config::DEFAULT_FLUSH_EVERY, run, OutputFormat, RunConfig};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Standardize Schedule RC filings into a reconciled bank-quarter asset panel"
)]
struct Args {
    /// First quarter end, YYYY-MM-DD
    #[arg(long)]
    start: NaiveDate,
    /// Last quarter end, YYYY-MM-DD
    #[arg(long)]
    end: NaiveDate,
    /// Directory holding one MMDDYY folder per quarter
    #[arg(long, default_value = "./raw")]
    raw_root: PathBuf,
    #[arg(long, default_value = "./output")]
    out_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Panel rows buffered between sink writes
    #[arg(long, default_value_t = DEFAULT_FLUSH_EVERY)]
    flush_every: usize,
    /// Quarters processed concurrently
    #[arg(short, long, default_value_t = default_jobs())]
    jobs: usize,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        RunConfig {
            start: args.start,
            end: args.end,
            raw_root: args.raw_root,
            out_dir: args.out_dir,
            format: args.format,
            flush_every: args.flush_every,
            jobs: args.jobs,
        }
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = RunConfig::from(Args::parse());
    info!(?config, "startup");

    let report = run(&config)?;

    let attempted = report.summaries.len();
    info!(
        attempted,
        ok = report.quarters_ok(),
        skipped = attempted - report.quarters_ok(),
        rows = report.rows_written,
        "done"
    );
    Ok(())
}
