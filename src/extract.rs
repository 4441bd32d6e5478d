//! Records extraction by calendar day

use chrono::{NaiveDate, Timelike};

use crate::table::{ObservationTable, TableError};

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("no record on {0}")]
    DateNotFound(NaiveDate),
    #[error("failed to concatenate the daily records")]
    Table(#[from] TableError),
}
type Result<T> = std::result::Result<T, ExtractError>;

/// Output layout of [filter_by_dates]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extraction {
    /// one table per day
    #[default]
    List,
    /// all the days in one table
    Table,
}

/// Records returned by [filter_by_dates]
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    List(Vec<ObservationTable>),
    Table(ObservationTable),
}
impl Extracted {
    /// Returns the list of daily tables, if any
    pub fn into_list(self) -> Option<Vec<ObservationTable>> {
        match self {
            Extracted::List(tables) => Some(tables),
            Extracted::Table(_) => None,
        }
    }
    /// Returns the concatenated table, if any
    pub fn into_table(self) -> Option<ObservationTable> {
        match self {
            Extracted::Table(table) => Some(table),
            Extracted::List(_) => None,
        }
    }
    /// Total number of records
    pub fn len(&self) -> usize {
        match self {
            Extracted::List(tables) => tables.iter().map(|t| t.len()).sum(),
            Extracted::Table(table) => table.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retrieves the records of each day in `dates`, in the order of `dates`
///
/// The concatenated table keeps the original timestamps, so it is not chronological
/// if `dates` is not sorted.
pub fn filter_by_dates(
    table: &ObservationTable,
    dates: &[NaiveDate],
    output: Extraction,
) -> Result<Extracted> {
    let chronological = table.is_chronological();
    let days = dates
        .iter()
        .map(|&date| {
            let day = if chronological {
                table.sorted_day(date)
            } else {
                table.day(date)
            };
            if day.is_empty() {
                Err(ExtractError::DateNotFound(date))
            } else {
                Ok(day)
            }
        })
        .collect::<Result<Vec<ObservationTable>>>()?;
    Ok(match output {
        Extraction::List => Extracted::List(days),
        Extraction::Table => Extracted::Table(ObservationTable::concat(&days)?),
    })
}

/// Daily records keyed by the hour of the day
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile {
    pub columns: Vec<String>,
    /// (hour, values in column order)
    pub rows: Vec<(u32, Vec<Option<f64>>)>,
}

/// Re-keys daily tables by hour of the day
pub fn dates_to_hours(tables: &[ObservationTable]) -> Vec<HourlyProfile> {
    tables
        .iter()
        .map(|table| HourlyProfile {
            columns: table.columns().to_vec(),
            rows: table
                .index()
                .iter()
                .enumerate()
                .map(|(i, t)| (t.hour(), table.row(i)))
                .collect(),
        })
        .collect()
}

/// Present values of `column` per hour of the day, from 0 to 23
///
/// Profiles without `column` are skipped.
pub fn hourly_values(profiles: &[HourlyProfile], column: &str) -> Vec<Vec<f64>> {
    let mut hours = vec![vec![]; 24];
    for profile in profiles {
        let Some(k) = profile.columns.iter().position(|c| c == column) else {
            continue;
        };
        for (hour, values) in &profile.rows {
            if let Some(v) = values[k] {
                hours[*hour as usize].push(v);
            }
        }
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn table() -> ObservationTable {
        let t0 = NaiveDate::from_ymd_opt(2021, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        // 3 full days and a partial fourth one
        let n = 24 * 3 + 5;
        ObservationTable::new(
            (0..n).map(|h| t0 + Duration::hours(h)).collect(),
            vec![
                ("so2", (0..n).map(|i| Some(i as f64)).collect()),
                ("wind", (0..n).map(|i| Some(-i as f64)).collect()),
            ],
        )
        .unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 5, d).unwrap()
    }

    #[test]
    fn list() {
        let days = filter_by_dates(&table(), &[date(4), date(2)], Extraction::List)
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].len(), 5);
        assert_eq!(days[1].len(), 24);
        assert!(days[0].index().iter().all(|t| t.date() == date(4)));
        assert_eq!(days[1].column("so2").unwrap()[0], Some(24.));
    }

    #[test]
    fn concatenated() {
        let dates = [date(3), date(1), date(4)];
        let table = table();
        let per_day: usize = filter_by_dates(&table, &dates, Extraction::List)
            .unwrap()
            .into_list()
            .unwrap()
            .iter()
            .map(|t| t.len())
            .sum();
        let all = filter_by_dates(&table, &dates, Extraction::Table)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(all.len(), per_day);
        assert_eq!(all.len(), 24 + 24 + 5);
        assert_eq!(all.index()[0].date(), date(3));
        assert_eq!(all.index()[24].date(), date(1));
        assert_eq!(all.index()[48].date(), date(4));
        assert!(!all.is_chronological());
    }

    #[test]
    fn unsorted_table() {
        let table = table();
        let rows: Vec<usize> = (0..table.len()).rev().collect();
        let reversed = table.take(&rows);
        let days = filter_by_dates(&reversed, &[date(2), date(4)], Extraction::List)
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(days[0].len(), 24);
        assert_eq!(days[1].len(), 5);
        assert_eq!(days[0].column("so2").unwrap()[0], Some(47.));
        assert!(matches!(
            filter_by_dates(&reversed, &[date(9)], Extraction::List),
            Err(ExtractError::DateNotFound(_))
        ));
    }

    #[test]
    fn missing_date() {
        let result = filter_by_dates(&table(), &[date(1), date(9)], Extraction::Table);
        assert!(matches!(result, Err(ExtractError::DateNotFound(d)) if d == date(9)));
    }

    #[test]
    fn hourly() {
        let days = filter_by_dates(&table(), &[date(2)], Extraction::List)
            .unwrap()
            .into_list()
            .unwrap();
        let profiles = dates_to_hours(&days);
        assert_eq!(profiles[0].rows.len(), 24);
        assert_eq!(profiles[0].rows[5], (5, vec![Some(29.), Some(-29.)]));
        assert_eq!(profiles[0].columns, vec!["so2".to_string(), "wind".to_string()]);
    }

    #[test]
    fn per_hour() {
        let days = filter_by_dates(&table(), &[date(1), date(4)], Extraction::List)
            .unwrap()
            .into_list()
            .unwrap();
        let hours = hourly_values(&dates_to_hours(&days), "so2");
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[2], vec![2., 74.]);
        assert_eq!(hours[10], vec![10.]);
        assert!(hourly_values(&dates_to_hours(&days), "rain")
            .iter()
            .all(|h| h.is_empty()));
    }
}
