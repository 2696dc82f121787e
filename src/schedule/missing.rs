use std::collections::BTreeSet;

use crate::filing::FilingTable;

/// Declared identifiers the file has no column for, lowercased and sorted.
/// Only column presence counts: a column that exists but is blank on every
/// row is not missing.
pub fn track<'a>(
    table: &FilingTable,
    declared: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    declared
        .into_iter()
        .filter(|id| !table.has_column(id))
        .map(str::to_ascii_lowercase)
        .collect()
}
