use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::{fs, io::Cursor, path::Path};
use tracing::{debug, warn};

use super::FilingTable;
use crate::error::QuarterError;

/// Read one Schedule RC file. A strict, quote-aware parse is tried first; if
/// it fails anywhere, the file is re-read leniently (quotes are ordinary
/// characters, malformed lines are dropped).
pub fn read_filing(path: &Path) -> Result<FilingTable, QuarterError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = fs::read(path).map_err(|e| QuarterError::Parse {
        file: name.clone(),
        strict: format!("reading file: {}", e),
        lenient: "not attempted".into(),
    })?;

    parse_filing(&name, &bytes)
}

pub fn parse_filing(source: &str, bytes: &[u8]) -> Result<FilingTable, QuarterError> {
    let delimiter = sniff_delimiter(bytes);

    let strict_err = match read_strict(bytes, delimiter) {
        Ok((headers, rows)) => {
            debug!(source, rows = rows.len(), "strict parse ok");
            return Ok(FilingTable::new(source, headers, rows));
        }
        Err(e) => e,
    };
    warn!(source, error = %strict_err, "strict parse failed, retrying leniently");

    match read_lenient(bytes, delimiter) {
        Ok((headers, rows, dropped)) => {
            if dropped > 0 {
                warn!(source, dropped, "lenient parse dropped malformed lines");
            }
            Ok(FilingTable::new(source, headers, rows))
        }
        Err(lenient_err) => Err(QuarterError::Parse {
            file: source.to_string(),
            strict: format!("{:#}", strict_err),
            lenient: format!("{:#}", lenient_err),
        }),
    }
}

/// Tab when the header line has one, comma otherwise.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    if header.contains(&b'\t') {
        b'\t'
    } else {
        b','
    }
}

fn read_strict(bytes: &[u8], delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(Cursor::new(bytes));

    let headers: Vec<String> = rdr
        .headers()
        .context("reading header line")?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(anyhow!("empty header line"));
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("record {}", idx + 1))?;
        // an unmatched quote swallows the following lines into one field
        if record.iter().any(|f| f.contains(['\n', '\r'])) {
            let line = record.position().map_or(0, |p| p.line());
            return Err(anyhow!("record {} starting on line {} spans several lines", idx + 1, line));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn read_lenient(bytes: &[u8], delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>, usize)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(Cursor::new(bytes));

    let mut records = rdr.byte_records();
    let headers: Vec<String> = match records.next() {
        Some(Ok(rec)) => rec
            .iter()
            .map(|f| String::from_utf8_lossy(f).to_string())
            .collect(),
        Some(Err(e)) => return Err(e).context("reading header line"),
        None => return Err(anyhow!("no header line")),
    };
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(anyhow!("empty header line"));
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for result in records {
        match result {
            Ok(rec) if rec.len() == headers.len() => rows.push(
                rec.iter()
                    .map(|f| String::from_utf8_lossy(f).to_string())
                    .collect(),
            ),
            _ => dropped += 1,
        }
    }
    Ok((headers, rows, dropped))
}
