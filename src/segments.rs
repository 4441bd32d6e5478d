//! Calendar day segmentation

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::table::{ObservationTable, TableError};

type Result<T> = std::result::Result<T, TableError>;

/// The records of one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySegment {
    /// the calendar day of every record in the segment
    pub date: NaiveDate,
    pub table: ObservationTable,
}
impl DailySegment {
    /// Iterator over the present values of column `name`
    pub fn present(&self, name: &str) -> Result<impl Iterator<Item = f64> + '_> {
        Ok(self.table.column(name)?.iter().filter_map(|x| *x))
    }
    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Splits `table` into one segment per calendar day, in chronological order
///
/// The segments keep only the `columns` columns, or all of them if `columns` is empty.
/// Days without records are not represented.
pub fn daily_segments<S: AsRef<str>>(
    table: &ObservationTable,
    columns: &[S],
) -> Result<Vec<DailySegment>> {
    let table = table.select(columns)?;
    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    table
        .index()
        .iter()
        .enumerate()
        .for_each(|(i, t)| days.entry(t.date()).or_default().push(i));
    let segments: Vec<_> = days
        .into_iter()
        .map(|(date, rows)| DailySegment {
            date,
            table: table.take(&rows),
        })
        .collect();
    log::debug!(
        "{} records split into {} daily segments",
        table.len(),
        segments.len()
    );
    Ok(segments)
}
