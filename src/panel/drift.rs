use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::Path,
};

use super::{write_atomically, MissingField};
use crate::filing::ReportingDate;

/// Cross-quarter view of the missing-field log: for each identifier, the
/// quarters whose filing lacked it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub quarters_read: usize,
    pub absent: BTreeMap<String, Vec<ReportingDate>>,
}

impl DriftReport {
    pub fn new(quarters_read: usize, missing: &[MissingField]) -> Self {
        let mut absent: BTreeMap<String, Vec<ReportingDate>> = BTreeMap::new();
        for m in missing {
            absent.entry(m.missing_col.clone()).or_default().push(m.date);
        }
        for dates in absent.values_mut() {
            dates.sort();
            dates.dedup();
        }
        Self {
            quarters_read,
            absent,
        }
    }

    /// Identifiers absent from every quarter that was read.
    pub fn never_present(&self) -> Vec<&str> {
        self.absent
            .iter()
            .filter(|(_, dates)| self.quarters_read > 0 && dates.len() == self.quarters_read)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Pretty JSON, staged beside `path` and renamed over it.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomically(path, |tmp| {
            let mut file =
                fs::File::create(tmp).with_context(|| format!("creating {}", tmp.display()))?;
            serde_json::to_writer_pretty(&mut file, self).context("serializing drift report")?;
            file.write_all(b"\n")?;
            Ok(())
        })
    }
}
