use super::aggregate::StandardizedRow;
use super::category::Category;
use super::resolve::sum_present;

/// Currency units of slack allowed between the category sum and the
/// reported total, to absorb rounding in the filings.
pub const RECONCILIATION_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub assetcheck: Option<f64>,
    pub diff: Option<f64>,
    /// Both sides present.
    pub evaluated: bool,
    pub passed: bool,
}

/// Sum of the component categories, in category order, skipping "no value".
pub fn assetcheck(categories: &[Option<f64>; Category::COUNT]) -> Option<f64> {
    sum_present(
        Category::ALL
            .iter()
            .filter(|c| c.is_component())
            .map(|c| categories[c.index()]),
    )
}

pub fn check(row: &StandardizedRow, tolerance: f64) -> Reconciliation {
    let assetcheck = assetcheck(&row.categories);
    let diff = assetcheck.map(|sum| sum - row.reported_total);
    let evaluated = diff.is_some();
    Reconciliation {
        assetcheck,
        diff,
        evaluated,
        passed: diff.map_or(false, |d| d.abs() <= tolerance),
    }
}
