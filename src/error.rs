//! Quarter-level failure taxonomy.
//!
//! A `QuarterError` is fatal for the quarter it came from and for nothing
//! else: the pipeline turns it into a `QuarterStatus` on the summary row and
//! moves on. Schema drift and reconciliation failures are data, not errors,
//! and never show up here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuarterError {
    #[error("quarter directory not found: {}", .0.display())]
    QuarterDirMissing(PathBuf),

    #[error("no Schedule RC file under {}", .0.display())]
    NoScheduleFile(PathBuf),

    #[error("could not parse {file}: strict: {strict}; lenient: {lenient}")]
    Parse {
        file: String,
        strict: String,
        lenient: String,
    },

    #[error("{0} has no institution id column")]
    NoInstitutionColumn(String),
}

impl QuarterError {
    pub fn status(&self) -> QuarterStatus {
        match self {
            QuarterError::QuarterDirMissing(_) | QuarterError::NoScheduleFile(_) => {
                QuarterStatus::NoFile
            }
            QuarterError::Parse { .. } => QuarterStatus::ParseError,
            QuarterError::NoInstitutionColumn(_) => QuarterStatus::NoInstitutionColumn,
        }
    }
}

/// Outcome flag carried on every quarter summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarterStatus {
    Ok,
    NoFile,
    ParseError,
    NoInstitutionColumn,
}

impl QuarterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuarterStatus::Ok => "ok",
            QuarterStatus::NoFile => "no_file",
            QuarterStatus::ParseError => "parse_error",
            QuarterStatus::NoInstitutionColumn => "no_institution_column",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("{0} is not a calendar quarter end")]
    NotQuarterEnd(NaiveDate),

    #[error("no MMDDYYYY date in file name `{0}`")]
    NoDateInName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_quarters_share_the_no_file_status() {
        let dir = QuarterError::QuarterDirMissing(PathBuf::from("/raw/033101"));
        let file = QuarterError::NoScheduleFile(PathBuf::from("/raw/033101"));
        assert_eq!(dir.status(), QuarterStatus::NoFile);
        assert_eq!(file.status(), QuarterStatus::NoFile);
        assert_eq!(
            QuarterError::NoInstitutionColumn("x.txt".into()).status(),
            QuarterStatus::NoInstitutionColumn
        );
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&QuarterStatus::NoInstitutionColumn).unwrap();
        assert_eq!(json, "\"no_institution_column\"");
        assert_eq!(QuarterStatus::ParseError.as_str(), "parse_error");
    }
}
