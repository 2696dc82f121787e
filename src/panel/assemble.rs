use anyhow::{bail, Result};
use tracing::debug;

use super::{
    DriftReport, MemorySink, MissingField, PanelRow, PanelSink, QuarterOutcome, QuarterSummary,
};
use crate::error::QuarterStatus;
use crate::filing::ReportingDate;

/// Side tables produced alongside the panel rows.
#[derive(Debug, Clone, Default)]
pub struct PanelReport {
    /// One per attempted quarter, skipped ones included.
    pub summaries: Vec<QuarterSummary>,
    pub missing: Vec<MissingField>,
    pub rows_written: usize,
}

impl PanelReport {
    pub fn quarters_ok(&self) -> usize {
        self.summaries
            .iter()
            .filter(|s| s.status == QuarterStatus::Ok)
            .count()
    }

    pub fn drift(&self) -> DriftReport {
        DriftReport::new(self.quarters_ok(), &self.missing)
    }
}

/// Appends quarters, oldest first, into a sink. Rows are buffered and handed
/// over every `flush_every` rows and once more on `finish`.
pub struct PanelAssembler<S: PanelSink> {
    sink: S,
    flush_every: usize,
    buffer: Vec<PanelRow>,
    last_date: Option<ReportingDate>,
    report: PanelReport,
}

impl<S: PanelSink> PanelAssembler<S> {
    pub fn new(sink: S, flush_every: usize) -> Self {
        Self {
            sink,
            flush_every: flush_every.max(1),
            buffer: Vec::new(),
            last_date: None,
            report: PanelReport::default(),
        }
    }

    pub fn append(&mut self, outcome: QuarterOutcome) -> Result<()> {
        if let Some(last) = self.last_date {
            if outcome.date <= last {
                bail!("quarter {} appended after {}", outcome.date, last);
            }
        }
        self.last_date = Some(outcome.date);

        self.report.summaries.push(outcome.summary());
        self.report.missing.extend(outcome.missing);

        for row in outcome.rows {
            self.buffer.push(row);
            if self.buffer.len() >= self.flush_every {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.sink.write_rows(&self.buffer)?;
        self.report.rows_written += self.buffer.len();
        debug!(rows = self.buffer.len(), total = self.report.rows_written, "flushed panel rows");
        self.buffer.clear();
        Ok(())
    }

    pub fn finish(mut self) -> Result<(S, PanelReport)> {
        self.flush()?;
        self.sink.finish()?;
        Ok((self.sink, self.report))
    }
}

/// In-memory assembly of already computed quarters, in any order.
pub fn assemble(mut outcomes: Vec<QuarterOutcome>) -> Result<(Vec<PanelRow>, PanelReport)> {
    outcomes.sort_by_key(|o| o.date);
    let mut assembler = PanelAssembler::new(MemorySink::default(), usize::MAX);
    for outcome in outcomes {
        assembler.append(outcome)?;
    }
    let (sink, report) = assembler.finish()?;
    Ok((sink.rows, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Category, Component, StandardizedRow};
    use chrono::NaiveDate;

    fn q(y: i32, m: u32) -> ReportingDate {
        let d = NaiveDate::from_ymd_opt(y, m + 1, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(y + 1, 1, 1).unwrap())
            .pred_opt()
            .unwrap();
        ReportingDate::new(d).unwrap()
    }

    fn outcome(date: ReportingDate, ids: &[i64]) -> QuarterOutcome {
        let rows = ids
            .iter()
            .map(|&id| {
                PanelRow::new(
                    date,
                    StandardizedRow {
                        institution_id: id,
                        reported_total: 1.0,
                        categories: [None; Category::COUNT],
                        components: [None; Component::COUNT],
                    },
                )
            })
            .collect();
        QuarterOutcome {
            date,
            status: QuarterStatus::Ok,
            detail: String::new(),
            source_file: Some("rc.txt".into()),
            rows,
            missing: vec![MissingField {
                qdir: date.quarter_dir(),
                date,
                missing_col: "rconb987".into(),
                source_file: "rc.txt".into(),
            }],
        }
    }

    fn skipped(date: ReportingDate) -> QuarterOutcome {
        QuarterOutcome {
            date,
            status: QuarterStatus::NoFile,
            detail: "quarter directory not found".into(),
            source_file: None,
            rows: Vec::new(),
            missing: Vec::new(),
        }
    }

    #[test]
    fn assemble_sorts_and_keeps_recurring_institutions() -> Result<()> {
        let (rows, report) = assemble(vec![
            outcome(q(2002, 6), &[7, 8]),
            skipped(q(2002, 9)),
            outcome(q(2002, 3), &[7]),
        ])?;
        let keys: Vec<(i64, String)> = rows
            .iter()
            .map(|r| (r.institution_id, r.date.quarter_dir()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (7, "033102".to_string()),
                (7, "063002".to_string()),
                (8, "063002".to_string()),
            ]
        );
        assert_eq!(report.summaries.len(), 3);
        assert_eq!(report.summaries[2].status, QuarterStatus::NoFile);
        assert_eq!(report.summaries[2].banks, 0);
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.quarters_ok(), 2);
        Ok(())
    }

    #[test]
    fn flushes_every_n_rows_and_once_at_the_end() -> Result<()> {
        let mut asm = PanelAssembler::new(MemorySink::default(), 2);
        asm.append(outcome(q(2010, 3), &[1, 2, 3]))?;
        asm.append(outcome(q(2010, 6), &[1, 2]))?;
        let (sink, report) = asm.finish()?;
        // 2 + 2 rows on the threshold, the fifth on finish
        assert_eq!(sink.flushes, 3);
        assert_eq!(sink.rows.len(), 5);
        assert!(sink.finished);
        assert_eq!(report.rows_written, 5);
        Ok(())
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let mut asm = PanelAssembler::new(MemorySink::default(), 10);
        asm.append(outcome(q(2010, 6), &[1])).unwrap();
        assert!(asm.append(outcome(q(2010, 3), &[1])).is_err());
        assert!(asm.append(outcome(q(2010, 6), &[1])).is_err());
    }
}
