use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::filing::{quarter_ends, ReportingDate};

pub const DEFAULT_FLUSH_EVERY: usize = 50_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Everything a panel build needs from the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Holds one `MMDDYY` directory per quarter.
    pub raw_root: PathBuf,
    pub out_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Panel rows buffered before each sink write.
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
    /// Quarters processed concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_flush_every() -> usize {
    DEFAULT_FLUSH_EVERY
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl RunConfig {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        raw_root: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            start,
            end,
            raw_root: raw_root.into(),
            out_dir: out_dir.into(),
            format: OutputFormat::default(),
            flush_every: DEFAULT_FLUSH_EVERY,
            jobs: default_jobs(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            bail!("start {} is after end {}", self.start, self.end);
        }
        if self.flush_every == 0 {
            bail!("flush_every must be at least 1");
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        Ok(())
    }

    /// Every quarter end in `[start, end]`, oldest first.
    pub fn quarters(&self) -> Vec<ReportingDate> {
        quarter_ends(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn inverted_range_is_rejected() {
        let cfg = RunConfig::new(d(2001, 3, 31), d(2000, 12, 31), "raw", "out");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("after end"));
    }

    #[test]
    fn quarters_cover_the_range() {
        let cfg = RunConfig::new(d(1999, 12, 31), d(2000, 12, 31), "raw", "out");
        cfg.validate().unwrap();
        let dirs: Vec<String> = cfg.quarters().iter().map(|q| q.quarter_dir()).collect();
        assert_eq!(dirs, vec!["123199", "033100", "063000", "093000", "123100"]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{"start":"2001-03-31","end":"2001-06-30","raw_root":"raw","out_dir":"out","format":"parquet"}"#,
        )
        .unwrap();
        assert_eq!(cfg.format, OutputFormat::Parquet);
        assert_eq!(cfg.flush_every, DEFAULT_FLUSH_EVERY);
        assert!(cfg.jobs >= 1);
    }
}
