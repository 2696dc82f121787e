use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};

use super::ReportingDate;

/// `<raw_root>/<MMDDYY>`
pub fn quarter_dir(raw_root: &Path, date: ReportingDate) -> PathBuf {
    raw_root.join(date.quarter_dir())
}

/// First file matching `*Schedule RC *.txt` in `qdir`. The space after `RC`
/// keeps RCA, RCB, ... schedules out.
pub fn find_schedule_rc_file(qdir: &Path) -> Result<Option<PathBuf>> {
    let pattern = format!(
        "{}/*Schedule RC *.txt",
        Pattern::escape(&qdir.display().to_string())
    );
    let mut candidates: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob pattern `{}`", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn picks_schedule_rc_over_sub_schedules() -> Result<()> {
        let tmp = tempdir()?;
        let q = ReportingDate::new(NaiveDate::from_ymd_opt(2002, 3, 31).unwrap()).unwrap();
        let qdir = quarter_dir(tmp.path(), q);
        fs::create_dir_all(&qdir)?;
        for name in [
            "FFIEC CDR Call Schedule RCA 03312002.txt",
            "FFIEC CDR Call Schedule RCB 03312002(1 of 2).txt",
            "FFIEC CDR Call Schedule RC 03312002.txt",
            "Readme.txt",
        ] {
            fs::write(qdir.join(name), "x")?;
        }

        let found = find_schedule_rc_file(&qdir)?.expect("schedule RC present");
        assert_eq!(
            found.file_name().unwrap().to_string_lossy(),
            "FFIEC CDR Call Schedule RC 03312002.txt"
        );
        assert!(qdir.ends_with("033102"));
        Ok(())
    }

    #[test]
    fn empty_dir_has_no_schedule() -> Result<()> {
        let tmp = tempdir()?;
        assert!(find_schedule_rc_file(tmp.path())?.is_none());
        Ok(())
    }
}
