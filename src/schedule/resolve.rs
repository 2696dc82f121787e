use crate::filing::FilingTable;

/// One value per filing row; `None` is "no value".
pub type Column = Vec<Option<f64>>;

/// The encodings a concept may be filed under: the consolidated (`RCFD`)
/// code, preferred, and the domestic-office (`RCON`) code it falls back to.
/// Some items only exist domestically and have no alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPair {
    pub primary: &'static str,
    pub alternate: Option<&'static str>,
}

impl FieldPair {
    pub const fn new(primary: &'static str, alternate: &'static str) -> Self {
        Self {
            primary,
            alternate: Some(alternate),
        }
    }

    pub const fn single(primary: &'static str) -> Self {
        Self {
            primary,
            alternate: None,
        }
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.primary).chain(self.alternate)
    }
}

/// Resolve a pair into one column: the primary value unless it is missing or
/// zero, in which case a present, non-zero alternate wins. Absent columns
/// read as all "no value". The table is not modified.
pub fn resolve(table: &FilingTable, pair: FieldPair) -> Column {
    let n = table.num_rows();
    let a = table
        .numeric_column(pair.primary)
        .unwrap_or_else(|| vec![None; n]);
    let b = pair
        .alternate
        .and_then(|alt| table.numeric_column(alt))
        .unwrap_or_else(|| vec![None; n]);

    a.into_iter().zip(b).map(|(a, b)| prefer(a, b)).collect()
}

pub fn prefer(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), _) if x != 0.0 => Some(x),
        (_, Some(y)) if y != 0.0 => Some(y),
        (a, _) => a,
    }
}

/// Row-wise sum that skips "no value"; all-missing stays "no value".
pub fn sum_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASH: FieldPair = FieldPair::new("RCFD0081", "RCON0081");

    fn table(rows: &[(&str, &str)]) -> FilingTable {
        FilingTable::new(
            "rc.txt",
            vec!["IDRSSD".into(), "RCFD0081".into(), "RCON0081".into()],
            rows.iter()
                .enumerate()
                .map(|(i, (a, b))| vec![i.to_string(), a.to_string(), b.to_string()])
                .collect(),
        )
    }

    #[test]
    fn consolidated_wins_when_present_and_non_zero() {
        let t = table(&[("100", "0"), ("100", "7"), ("-3", "")]);
        assert_eq!(resolve(&t, CASH), vec![Some(100.0), Some(100.0), Some(-3.0)]);
    }

    #[test]
    fn domestic_fills_missing_or_zero_consolidated() {
        let t = table(&[("0", "50"), ("", "50"), ("x", "50")]);
        assert_eq!(resolve(&t, CASH), vec![Some(50.0); 3]);
    }

    #[test]
    fn both_empty_or_zero_keeps_the_consolidated_reading() {
        let t = table(&[("", ""), ("0", ""), ("0", "0"), ("", "0")]);
        assert_eq!(resolve(&t, CASH), vec![None, Some(0.0), Some(0.0), None]);
    }

    #[test]
    fn absent_columns_resolve_to_no_value() {
        let t = table(&[("1", "2")]);
        let only_domestic = FieldPair::new("RCFDB987", "RCON0081");
        assert_eq!(resolve(&t, only_domestic), vec![Some(2.0)]);
        let neither = FieldPair::new("RCFD9999", "RCON9999");
        assert_eq!(resolve(&t, neither), vec![None]);
        assert_eq!(resolve(&t, FieldPair::single("rcon0081")), vec![Some(2.0)]);
    }

    #[test]
    fn resolve_leaves_the_table_alone() {
        let t = table(&[("0", "50")]);
        let before = t.rows.clone();
        let _ = resolve(&t, CASH);
        assert_eq!(t.rows, before);
    }

    #[test]
    fn sums_skip_missing_but_keep_all_missing_distinct_from_zero() {
        assert_eq!(sum_present([Some(1.0), None, Some(2.5)]), Some(3.5));
        assert_eq!(sum_present([None, Some(0.0)]), Some(0.0));
        assert_eq!(sum_present([None, None]), None);
        assert_eq!(sum_present(Vec::<Option<f64>>::new()), None);
    }
}
