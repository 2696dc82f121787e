use serde::{Deserialize, Serialize};

use super::QuarterOutcome;
use crate::error::QuarterStatus;
use crate::filing::ReportingDate;

/// Per-quarter reconciliation statistics. Diff statistics cover evaluated
/// rows only and are empty when nothing was evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterSummary {
    pub qdir: String,
    pub date: ReportingDate,
    pub status: QuarterStatus,
    pub detail: String,
    pub source_file: String,
    pub banks: usize,
    pub evaluated: usize,
    pub passed: usize,
    pub pass_rate: Option<f64>,
    pub mean_abs_diff: Option<f64>,
    pub min_diff: Option<f64>,
    pub max_diff: Option<f64>,
    pub missing_cols: usize,
}

impl QuarterSummary {
    pub const COLUMNS: [&'static str; 13] = [
        "qdir",
        "date",
        "status",
        "detail",
        "source_file",
        "banks",
        "evaluated",
        "passed",
        "pass_rate",
        "mean_abs_diff",
        "min_diff",
        "max_diff",
        "missing_cols",
    ];

    pub fn from_outcome(outcome: &QuarterOutcome) -> Self {
        let diffs: Vec<f64> = outcome
            .rows
            .iter()
            .filter_map(|r| r.reconciliation.diff)
            .collect();
        let passed = outcome
            .rows
            .iter()
            .filter(|r| r.reconciliation.passed)
            .count();

        let n = diffs.len();
        let (pass_rate, mean_abs_diff, min_diff, max_diff) = if n == 0 {
            (None, None, None, None)
        } else {
            (
                Some(passed as f64 / n as f64),
                Some(diffs.iter().map(|d| d.abs()).sum::<f64>() / n as f64),
                diffs.iter().copied().reduce(f64::min),
                diffs.iter().copied().reduce(f64::max),
            )
        };

        Self {
            qdir: outcome.date.quarter_dir(),
            date: outcome.date,
            status: outcome.status,
            detail: outcome.detail.clone(),
            source_file: outcome.source_file.clone().unwrap_or_default(),
            banks: outcome.rows.len(),
            evaluated: n,
            passed,
            pass_rate,
            mean_abs_diff,
            min_diff,
            max_diff,
            missing_cols: outcome.missing.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelRow;
    use crate::schedule::{Category, Component, StandardizedRow};
    use chrono::NaiveDate;

    fn date() -> ReportingDate {
        ReportingDate::new(NaiveDate::from_ymd_opt(2015, 9, 30).unwrap()).unwrap()
    }

    fn row(cash: Option<f64>, total: f64) -> PanelRow {
        let mut categories = [None; Category::COUNT];
        categories[Category::Cash.index()] = cash;
        PanelRow::new(
            date(),
            StandardizedRow {
                institution_id: 1,
                reported_total: total,
                categories,
                components: [None; Component::COUNT],
            },
        )
    }

    fn outcome(rows: Vec<PanelRow>) -> QuarterOutcome {
        QuarterOutcome {
            date: date(),
            status: QuarterStatus::Ok,
            detail: String::new(),
            source_file: Some("FFIEC CDR Call Schedule RC 09302015.txt".into()),
            rows,
            missing: Vec::new(),
        }
    }

    #[test]
    fn statistics_cover_evaluated_rows_only() {
        let s = outcome(vec![
            row(Some(100.0), 100.0),
            row(Some(90.0), 100.0),
            row(Some(104.0), 100.0),
            row(None, 100.0),
        ])
        .summary();
        assert_eq!(s.banks, 4);
        assert_eq!(s.evaluated, 3);
        assert_eq!(s.passed, 1);
        assert_eq!(s.pass_rate, Some(1.0 / 3.0));
        assert_eq!(s.mean_abs_diff, Some(14.0 / 3.0));
        assert_eq!(s.min_diff, Some(-10.0));
        assert_eq!(s.max_diff, Some(4.0));
        assert_eq!(s.qdir, "093015");
    }

    #[test]
    fn nothing_evaluated_leaves_statistics_empty() {
        let s = outcome(vec![row(None, 5.0)]).summary();
        assert_eq!(s.evaluated, 0);
        assert_eq!(s.pass_rate, None);
        assert_eq!(s.min_diff, None);
    }
}
