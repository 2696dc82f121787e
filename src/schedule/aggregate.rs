use tracing::debug;

use super::category::{Category, Component};
use super::regime::{RegimeTable, Role, REPORTED_TOTAL};
use super::resolve::{resolve, Column};
use crate::error::QuarterError;
use crate::filing::{parse_institution_id, FilingTable, ReportingDate};

/// One institution's standardized balance sheet for one quarter.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedRow {
    pub institution_id: i64,
    /// Resolved RCFD2170/RCON2170; rows without it never get this far.
    pub reported_total: f64,
    pub categories: [Option<f64>; Category::COUNT],
    pub components: [Option<f64>; Component::COUNT],
}

impl StandardizedRow {
    pub fn category(&self, category: Category) -> Option<f64> {
        self.categories[category.index()]
    }

    pub fn component(&self, component: Component) -> Option<f64> {
        self.components[component.index()]
    }
}

#[derive(Debug, Clone)]
pub struct StandardizedQuarter {
    pub date: ReportingDate,
    pub rows: Vec<StandardizedRow>,
    pub dropped_without_id: usize,
    pub dropped_without_total: usize,
}

/// Standardize every row of one quarter's filing under the regimes in force
/// on `date`. Categories with no applicable regime are "no value" for the
/// whole quarter; identifiers the file lacks resolve to "no value".
pub fn compute(
    table: &FilingTable,
    date: ReportingDate,
    regimes: &RegimeTable,
) -> Result<StandardizedQuarter, QuarterError> {
    let id_col = table
        .institution_column()
        .ok_or_else(|| QuarterError::NoInstitutionColumn(table.source.clone()))?;
    let n = table.num_rows();

    let mut components: Vec<Option<Column>> = vec![None; Component::COUNT];
    let mut categories: Vec<Column> = Vec::with_capacity(Category::COUNT);

    for category in Category::ALL {
        let Some(rule) = regimes.select_formula(category, date.date()) else {
            categories.push(vec![None; n]);
            continue;
        };

        let mut addends: Vec<Column> = Vec::new();
        for part in &rule.parts {
            let resolved = resolve(table, part.fields);
            if let Some(component) = part.component {
                components[component.index()] = Some(resolved.clone());
            }
            if part.role == Role::Addend {
                addends.push(resolved);
            }
        }

        let mut values = Vec::with_capacity(addends.len());
        let column = (0..n)
            .map(|r| {
                values.clear();
                values.extend(addends.iter().map(|c| c[r]));
                rule.apply(&values)
            })
            .collect();
        categories.push(column);
    }

    let reported = resolve(table, REPORTED_TOTAL);

    let mut rows = Vec::with_capacity(n);
    let mut dropped_without_id = 0;
    let mut dropped_without_total = 0;
    for r in 0..n {
        let Some(institution_id) = table.cell(r, id_col).and_then(parse_institution_id) else {
            dropped_without_id += 1;
            continue;
        };
        let Some(reported_total) = reported[r] else {
            dropped_without_total += 1;
            continue;
        };
        rows.push(StandardizedRow {
            institution_id,
            reported_total,
            categories: std::array::from_fn(|i| categories[i][r]),
            components: std::array::from_fn(|i| components[i].as_ref().and_then(|c| c[r])),
        });
    }

    debug!(
        date = %date,
        rows = rows.len(),
        dropped_without_id,
        dropped_without_total,
        "standardized quarter"
    );

    Ok(StandardizedQuarter {
        date,
        rows,
        dropped_without_id,
        dropped_without_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn q(y: i32, m: u32, d: u32) -> ReportingDate {
        ReportingDate::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> FilingTable {
        FilingTable::new(
            "FFIEC CDR Call Schedule RC 03312019.txt",
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn sums_resolved_parts_and_keeps_intermediates() {
        let t = table(
            &["IDRSSD", "RCFD0081", "RCON0081", "RCON0071", "RCFDJJ34", "RCON1773", "RCFD2170"],
            &[
                &["", "Cash", "Cash", "Int", "HTM", "AFS", "Total"],
                &["37", "0", "10", "5", "100", "", "115"],
                &["242", "3", "", "", "", "", "3"],
            ],
        );
        let out = compute(&t, q(2019, 3, 31), &RegimeTable::standard()).unwrap();
        assert_eq!(out.dropped_without_id, 1);
        assert_eq!(out.rows.len(), 2);

        let a = &out.rows[0];
        assert_eq!(a.institution_id, 37);
        assert_eq!(a.category(Category::Cash), Some(15.0));
        assert_eq!(a.component(Component::CashNoninterest), Some(10.0));
        assert_eq!(a.category(Category::Securities), Some(100.0));
        assert_eq!(a.component(Component::SecuritiesEquity), None);
        assert_eq!(a.category(Category::TotalAssets), Some(115.0));
        assert_eq!(a.category(Category::Loans), None);

        let b = &out.rows[1];
        assert_eq!(b.category(Category::Cash), Some(3.0));
        assert_eq!(b.category(Category::Securities), None);
    }

    #[test]
    fn passthrough_and_memo_items() {
        let t = table(
            &["RSSD9001", "RCFD2125", "RCFD2122", "RCFD3123", "RCFD1350", "RCFD2170"],
            &[&["1", "900", "1000", "100", "", "950"]],
        );
        let out = compute(&t, q(1990, 6, 30), &RegimeTable::standard()).unwrap();
        let row = &out.rows[0];
        assert_eq!(row.category(Category::Loans), Some(900.0));
        assert_eq!(row.component(Component::LoansNetUnearnedIncome), Some(1000.0));
        assert_eq!(row.component(Component::LoansAllowance), Some(100.0));
        assert_eq!(row.component(Component::LoansHeldForSale), None);
        assert_eq!(row.category(Category::FedFundsRepo), None);
    }

    #[test]
    fn rows_without_a_reported_total_are_dropped() {
        let t = table(
            &["IDRSSD", "RCFD2170", "RCON2170"],
            &[&["1", "", ""], &["2", "0", ""], &["3", "", "7"]],
        );
        let out = compute(&t, q(2010, 12, 31), &RegimeTable::standard()).unwrap();
        let ids: Vec<i64> = out.rows.iter().map(|r| r.institution_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(out.dropped_without_total, 1);
        assert_eq!(out.rows[1].reported_total, 7.0);
    }

    #[test]
    fn item9_gap_depends_on_the_table() {
        let t = table(&["IDRSSD", "RCFD2155", "RCFD2170"], &[&["1", "4", "4"]]);
        let gap = q(2007, 3, 31);

        let standard = compute(&t, gap, &RegimeTable::standard()).unwrap();
        assert_eq!(standard.rows[0].category(Category::Item9), None);

        let zero = compute(&t, gap, &RegimeTable::with_item9_gap_zero_filled()).unwrap();
        assert_eq!(zero.rows[0].category(Category::Item9), Some(0.0));
    }

    #[test]
    fn before_any_window_every_category_is_no_value() {
        let t = table(&["IDRSSD", "RCFD0081", "RCFD2170"], &[&["1", "5", "5"]]);
        let out = compute(&t, q(1975, 12, 31), &RegimeTable::standard()).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert!(out.rows[0].categories.iter().all(Option::is_none));
        assert!(out.rows[0].components.iter().all(Option::is_none));
    }

    #[test]
    fn missing_institution_column_is_quarter_fatal() {
        let t = table(&["RCFD2170"], &[&["5"]]);
        let err = compute(&t, q(2010, 3, 31), &RegimeTable::standard()).unwrap_err();
        assert!(matches!(err, QuarterError::NoInstitutionColumn(_)));
    }
}
