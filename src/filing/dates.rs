use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DateError;

static EIGHT_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{8}").expect("static regex"));

/// A calendar quarter end (Mar 31, Jun 30, Sep 30, Dec 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct ReportingDate(NaiveDate);

impl ReportingDate {
    pub fn new(date: NaiveDate) -> Result<Self, DateError> {
        let is_month_end = date.succ_opt().map_or(true, |next| next.day() == 1);
        if date.month() % 3 == 0 && is_month_end {
            Ok(Self(date))
        } else {
            Err(DateError::NotQuarterEnd(date))
        }
    }

    /// The first quarter end on or after `date`.
    pub fn on_or_after(date: NaiveDate) -> Option<Self> {
        let quarter_month = (date.month() - 1) / 3 * 3 + 3;
        month_end(date.year(), quarter_month).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Quarter directory code, `MMDDYY` (2001-03-31 -> `033101`).
    pub fn quarter_dir(&self) -> String {
        self.0.format("%m%d%y").to_string()
    }

    pub fn next(&self) -> Option<Self> {
        let (y, m) = if self.0.month() == 12 {
            (self.0.year() + 1, 3)
        } else {
            (self.0.year(), self.0.month() + 3)
        };
        month_end(y, m).map(Self)
    }
}

impl TryFrom<NaiveDate> for ReportingDate {
    type Error = DateError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        Self::new(date)
    }
}

impl From<ReportingDate> for NaiveDate {
    fn from(d: ReportingDate) -> Self {
        d.0
    }
}

impl fmt::Display for ReportingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Every quarter end in `[start, end]`, ascending.
pub fn quarter_ends(start: NaiveDate, end: NaiveDate) -> Vec<ReportingDate> {
    let mut out = Vec::new();
    let mut cur = ReportingDate::on_or_after(start);
    while let Some(q) = cur {
        if q.date() > end {
            break;
        }
        out.push(q);
        cur = q.next();
    }
    out
}

/// Reads the first `MMDDYYYY` run in a file name,
/// e.g. `FFIEC CDR Call Schedule RC 03312001.txt` -> 2001-03-31.
pub fn date_from_file_name(name: &str) -> Result<NaiveDate, DateError> {
    EIGHT_DIGITS
        .find_iter(name)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%m%d%Y").ok())
        .ok_or_else(|| DateError::NoDateInName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn only_quarter_ends_are_reporting_dates() {
        assert!(ReportingDate::new(d(2001, 3, 31)).is_ok());
        assert!(ReportingDate::new(d(2001, 6, 30)).is_ok());
        assert!(ReportingDate::new(d(2001, 12, 31)).is_ok());
        assert_eq!(
            ReportingDate::new(d(2001, 6, 29)),
            Err(DateError::NotQuarterEnd(d(2001, 6, 29)))
        );
        assert!(ReportingDate::new(d(2001, 4, 30)).is_err());
    }

    #[test]
    fn quarter_dir_codes() {
        let q = ReportingDate::new(d(2001, 3, 31)).unwrap();
        assert_eq!(q.quarter_dir(), "033101");
        let q = ReportingDate::new(d(1976, 12, 31)).unwrap();
        assert_eq!(q.quarter_dir(), "123176");
    }

    #[test]
    fn quarter_range_is_inclusive_and_rounds_start_up() {
        let qs = quarter_ends(d(2000, 11, 15), d(2001, 9, 30));
        let got: Vec<String> = qs.iter().map(|q| q.to_string()).collect();
        assert_eq!(
            got,
            vec!["2000-12-31", "2001-03-31", "2001-06-30", "2001-09-30"]
        );
        assert!(quarter_ends(d(2001, 4, 1), d(2001, 6, 29)).is_empty());
    }

    #[test]
    fn file_name_dates() {
        assert_eq!(
            date_from_file_name("FFIEC CDR Call Schedule RC 03312001.txt"),
            Ok(d(2001, 3, 31))
        );
        assert_eq!(
            date_from_file_name("FFIEC CDR Call Schedule RC 12312019(1 of 2).txt"),
            Ok(d(2019, 12, 31))
        );
        assert!(date_from_file_name("Schedule RC.txt").is_err());
        assert!(date_from_file_name("Schedule RC 99999999.txt").is_err());
    }

    #[test]
    fn serde_rejects_non_quarter_ends() {
        let ok: ReportingDate = serde_json::from_str("\"2018-06-30\"").unwrap();
        assert_eq!(ok.date(), d(2018, 6, 30));
        assert!(serde_json::from_str::<ReportingDate>("\"2018-06-29\"").is_err());
    }
}
