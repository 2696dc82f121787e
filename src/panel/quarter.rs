use std::path::Path;
use tracing::{debug, info, instrument, warn};

use super::{MissingField, PanelRow, QuarterSummary};
use crate::error::{QuarterError, QuarterStatus};
use crate::filing::{
    date_from_file_name, find_schedule_rc_file, quarter_dir, read_filing, ReportingDate,
};
use crate::schedule::{compute, track, RegimeTable};

/// Everything one quarter contributes to the run, successful or not.
#[derive(Debug, Clone)]
pub struct QuarterOutcome {
    pub date: ReportingDate,
    pub status: QuarterStatus,
    /// Empty on success, the error text otherwise.
    pub detail: String,
    pub source_file: Option<String>,
    pub rows: Vec<PanelRow>,
    pub missing: Vec<MissingField>,
}

impl QuarterOutcome {
    fn failed(date: ReportingDate, source_file: Option<String>, err: &QuarterError) -> Self {
        warn!(
            qdir = %date.quarter_dir(),
            status = err.status().as_str(),
            error = %err,
            "quarter skipped"
        );
        Self {
            date,
            status: err.status(),
            detail: err.to_string(),
            source_file,
            rows: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn summary(&self) -> QuarterSummary {
        QuarterSummary::from_outcome(self)
    }
}

/// Locate, read and standardize the quarter at `<raw_root>/<MMDDYY>`.
/// Nothing that goes wrong inside the quarter escapes it.
#[instrument(skip_all, fields(qdir = %date.quarter_dir(), date = %date))]
pub fn process_quarter(
    raw_root: &Path,
    date: ReportingDate,
    regimes: &RegimeTable,
) -> QuarterOutcome {
    let qdir = quarter_dir(raw_root, date);
    if !qdir.is_dir() {
        return QuarterOutcome::failed(date, None, &QuarterError::QuarterDirMissing(qdir));
    }

    let path = match find_schedule_rc_file(&qdir) {
        Ok(Some(path)) => path,
        Ok(None) => {
            return QuarterOutcome::failed(date, None, &QuarterError::NoScheduleFile(qdir));
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "listing quarter dir failed");
            return QuarterOutcome::failed(date, None, &QuarterError::NoScheduleFile(qdir));
        }
    };

    standardize_file(&path, date, regimes)
}

fn standardize_file(path: &Path, date: ReportingDate, regimes: &RegimeTable) -> QuarterOutcome {
    let source = file_name(path);
    match date_from_file_name(&source) {
        Ok(named) if named != date.date() => {
            warn!(
                file = %source,
                file_date = %named,
                "file name date disagrees, using quarter date"
            );
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "file name carries no date"),
    }

    let table = match read_filing(path) {
        Ok(table) => table,
        Err(e) => return QuarterOutcome::failed(date, Some(source), &e),
    };

    let standardized = match compute(&table, date, regimes) {
        Ok(s) => s,
        Err(e) => return QuarterOutcome::failed(date, Some(source), &e),
    };

    let absent = track(&table, regimes.declared_identifiers());
    if !absent.is_empty() {
        warn!(
            file = %source,
            count = absent.len(),
            absent = ?absent,
            "declared identifiers absent from filing"
        );
    }
    let missing = absent
        .into_iter()
        .map(|missing_col| MissingField {
            qdir: date.quarter_dir(),
            date,
            missing_col,
            source_file: source.clone(),
        })
        .collect();

    let rows = standardized
        .rows
        .into_iter()
        .map(|row| PanelRow::new(date, row))
        .collect();

    let outcome = QuarterOutcome {
        date,
        status: QuarterStatus::Ok,
        detail: String::new(),
        source_file: Some(source),
        rows,
        missing,
    };

    let summary = outcome.summary();
    info!(
        banks = summary.banks,
        evaluated = summary.evaluated,
        pass_rate = summary.pass_rate.unwrap_or(f64::NAN),
        "quarter done"
    );
    outcome
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
