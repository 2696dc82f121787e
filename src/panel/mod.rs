//! The bank-quarter panel: per-quarter processing, chronological assembly
//! into a sink, and the side tables (quarter summary, missing-field log,
//! schema-drift report).

pub mod assemble;
pub mod drift;
pub mod quarter;
pub mod sink;
pub mod summary;

pub use assemble::{assemble, PanelAssembler, PanelReport};
pub use drift::DriftReport;
pub use quarter::{process_quarter, QuarterOutcome};
pub use sink::{panel_columns, CsvSink, MemorySink, PanelSink, ParquetSink};
pub use summary::QuarterSummary;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::config::{OutputFormat, RunConfig};
use crate::filing::ReportingDate;
use crate::schedule::{
    check, Category, Component, Reconciliation, RegimeTable, StandardizedRow,
    RECONCILIATION_TOLERANCE,
};

pub const PANEL_STEM: &str = "rc_assets_panel";
pub const SUMMARY_FILE: &str = "rc_assets_recon_summary.csv";
pub const MISSING_FILE: &str = "rc_assets_missing_cols.csv";
pub const DRIFT_FILE: &str = "rc_assets_schema_drift.json";

/// One (institution, quarter) row of the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub institution_id: i64,
    pub date: ReportingDate,
    pub categories: [Option<f64>; Category::COUNT],
    pub components: [Option<f64>; Component::COUNT],
    pub reconciliation: Reconciliation,
}

impl PanelRow {
    pub fn new(date: ReportingDate, row: StandardizedRow) -> Self {
        let reconciliation = check(&row, RECONCILIATION_TOLERANCE);
        Self {
            institution_id: row.institution_id,
            date,
            categories: row.categories,
            components: row.components,
            reconciliation,
        }
    }

    pub fn category(&self, category: Category) -> Option<f64> {
        self.categories[category.index()]
    }
}

/// One identifier a quarter's filing did not carry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissingField {
    pub qdir: String,
    pub date: ReportingDate,
    pub missing_col: String,
    pub source_file: String,
}

impl MissingField {
    pub const COLUMNS: [&'static str; 4] = ["qdir", "date", "missing_col", "source_file"];
}

/// Build the panel for every quarter in the configured range and write all
/// output artifacts under `out_dir`. Quarter failures end up in the summary;
/// only configuration and output I/O errors are returned.
pub fn run(config: &RunConfig) -> Result<PanelReport> {
    config.validate()?;
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating output dir {}", config.out_dir.display()))?;

    let panel_path = config
        .out_dir
        .join(format!("{}.{}", PANEL_STEM, config.format.extension()));
    let report = match config.format {
        OutputFormat::Csv => build(config, CsvSink::create(&panel_path)?)?,
        OutputFormat::Parquet => build(config, ParquetSink::create(&panel_path)?)?,
    };
    info!(path = %panel_path.display(), rows = report.rows_written, "wrote panel");

    let summary_path = config.out_dir.join(SUMMARY_FILE);
    write_table(&summary_path, &QuarterSummary::COLUMNS, &report.summaries)?;
    let missing_path = config.out_dir.join(MISSING_FILE);
    write_table(&missing_path, &MissingField::COLUMNS, &report.missing)?;
    let drift_path = config.out_dir.join(DRIFT_FILE);
    let drift = report.drift();
    drift.write(&drift_path)?;
    let never = drift.never_present();
    if !never.is_empty() {
        info!(
            count = never.len(),
            identifiers = ?never,
            "identifiers absent from every quarter read"
        );
    }
    info!(
        summary = %summary_path.display(),
        missing = %missing_path.display(),
        drift = %drift_path.display(),
        "wrote side tables"
    );

    Ok(report)
}

fn build<S: PanelSink>(config: &RunConfig, sink: S) -> Result<PanelReport> {
    let regimes = RegimeTable::standard();
    let quarters = config.quarters();
    info!(
        quarters = quarters.len(),
        start = %config.start,
        end = %config.end,
        jobs = config.jobs,
        "building panel"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .context("building worker pool")?;

    let mut assembler = PanelAssembler::new(sink, config.flush_every);
    for wave in quarters.chunks(config.jobs) {
        let mut outcomes: Vec<QuarterOutcome> = pool.install(|| {
            wave.par_iter()
                .map(|q| process_quarter(&config.raw_root, *q, &regimes))
                .collect()
        });
        outcomes.sort_by_key(|o| o.date);
        for outcome in outcomes {
            assembler.append(outcome)?;
        }
    }

    let (_, report) = assembler.finish()?;
    Ok(report)
}

/// CSV with a fixed header line, written even when there are no rows.
fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    write_atomically(path, |tmp| {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        wtr.write_record(header)?;
        for row in rows {
            wtr.serialize(row)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        wtr.flush()?;
        Ok(())
    })
}

/// Hidden sibling every output is staged in: `dir/.name.tmp`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

pub(crate) fn promote(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))
}

pub(crate) fn discard(tmp: &Path) {
    match fs::remove_file(tmp) {
        Ok(()) => debug!(path = %tmp.display(), "removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp.display(), error = %e, "could not remove partial output"),
    }
}

/// Stage `path` through `fill` and rename it into place; on any error the
/// staged file is removed and `path` is left untouched.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let tmp = tmp_path(path);
    let result = fill(&tmp).and_then(|()| promote(&tmp, path));
    if result.is_err() {
        discard(&tmp);
    }
    result
}
