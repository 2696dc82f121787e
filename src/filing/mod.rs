//! Raw Schedule RC filings: one quarter's table of institutions × raw
//! identifiers, plus the helpers that find, date and read it.

pub mod dates;
pub mod locate;
pub mod read;

pub use dates::{date_from_file_name, quarter_ends, ReportingDate};
pub use locate::{find_schedule_rc_file, quarter_dir};
pub use read::{parse_filing, read_filing};

use std::collections::HashMap;

/// Header names accepted as the institution identifier, in preference order.
/// `rssd9001` is what the 1976-2000 archive files call it.
pub const INSTITUTION_ID_COLUMNS: &[&str] = &["idrssd", "rssd9001"];

/// One quarter's filing table. Column names are normalized (unquoted,
/// lowercased) so identifier lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct FilingTable {
    /// File name the table was read from, for logs and the missing-field log.
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl FilingTable {
    pub fn new(
        source: impl Into<String>,
        headers: Vec<String>,
        mut rows: Vec<Vec<String>>,
    ) -> Self {
        let mut headers: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        // a trailing delimiter leaves an unnamed last column on every line
        while headers.last().map_or(false, |h| h.is_empty()) {
            headers.pop();
        }
        for row in &mut rows {
            row.truncate(headers.len());
        }

        let mut index = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            if !h.is_empty() {
                index.entry(h.clone()).or_insert(i);
            }
        }

        Self {
            source: source.into(),
            headers,
            rows,
            index,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, identifier: &str) -> Option<usize> {
        self.index.get(&identifier.to_ascii_lowercase()).copied()
    }

    pub fn has_column(&self, identifier: &str) -> bool {
        self.column_index(identifier).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Numeric view of one column, or `None` when the column does not exist.
    pub fn numeric_column(&self, identifier: &str) -> Option<Vec<Option<f64>>> {
        let col = self.column_index(identifier)?;
        Some(
            (0..self.rows.len())
                .map(|r| self.cell(r, col).and_then(parse_amount))
                .collect(),
        )
    }

    /// Position of the institution id column, if the file has one.
    pub fn institution_column(&self) -> Option<usize> {
        INSTITUTION_ID_COLUMNS
            .iter()
            .find_map(|name| self.column_index(name))
    }
}

/// Trim whitespace and strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

pub fn normalize_header(raw: &str) -> String {
    clean_str(raw).to_ascii_lowercase()
}

/// Blank, unparseable and non-finite cells are "no value".
pub fn parse_amount(raw: &str) -> Option<f64> {
    let v = clean_str(raw);
    if v.is_empty() {
        return None;
    }
    v.parse::<f64>().ok().filter(|x| x.is_finite())
}

pub fn parse_institution_id(raw: &str) -> Option<i64> {
    clean_str(raw).parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FilingTable {
        FilingTable::new(
            "FFIEC CDR Call Schedule RC 03312001.txt",
            vec![
                "\"IDRSSD\"".into(),
                "RCFD0081".into(),
                " rcon0081 ".into(),
                "".into(),
            ],
            vec![
                vec!["37".into(), "1,5".into(), "12".into(), "".into()],
                vec!["\"242\"".into(), "".into(), "NaN".into(), "".into()],
            ],
        )
    }

    #[test]
    fn headers_are_normalized_and_trailing_blank_column_dropped() {
        let t = table();
        assert_eq!(t.headers, vec!["idrssd", "rcfd0081", "rcon0081"]);
        assert!(t.rows.iter().all(|r| r.len() == 3));
        assert!(t.has_column("RCON0081"));
        assert!(!t.has_column("RCFD0071"));
        assert_eq!(t.institution_column(), Some(0));
    }

    #[test]
    fn numeric_column_maps_junk_to_no_value() {
        let t = table();
        assert_eq!(t.numeric_column("rcfd0081"), Some(vec![None, None]));
        assert_eq!(t.numeric_column("RCON0081"), Some(vec![Some(12.0), None]));
        assert_eq!(t.numeric_column("rcfd9999"), None);
    }

    #[test]
    fn archive_files_use_rssd9001() {
        let t = FilingTable::new("call7603", vec!["RSSD9001".into()], vec![]);
        assert_eq!(t.institution_column(), Some(0));
        let none = FilingTable::new("x", vec!["RCFD2170".into()], vec![]);
        assert_eq!(none.institution_column(), None);
    }

    #[test]
    fn cell_parsers() {
        assert_eq!(parse_amount(" \"1000000.50\" "), Some(1_000_000.5));
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_institution_id("\"480228\""), Some(480228));
        assert_eq!(parse_institution_id("Financial Institution ID"), None);
        assert_eq!(clean_str("\"\""), "");
    }
}
