//! Calendar features
//!
//! The records of a column are split into one gap-filled series per calendar day,
//! collected year by year, month by month and day by day.
//! The series are indexed by their (day, month, year) calendar key so that a window
//! of days can be selected for clustering.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::{collections::BTreeMap, collections::HashMap, fmt, str::FromStr};

use crate::{
    calendar::CalendarFeatures,
    table::{ObservationTable, TableError},
};

#[derive(thiserror::Error, Debug)]
pub enum FeatureError {
    #[error("no daily series for {0}")]
    WindowBoundaryNotFound(CalendarKey),
    #[error("malformed calendar day {0:?}, expected YYYY-MM-DD or DD/MM/YYYY")]
    MalformedKey(String),
    #[error("failed to select the feature column")]
    Table(#[from] TableError),
}
type Result<T> = std::result::Result<T, FeatureError>;

/// A calendar day as (day of month, month, year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarKey {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}
impl CalendarKey {
    pub fn new(day: u32, month: u32, year: i32) -> Self {
        Self { day, month, year }
    }
}
impl From<(u32, u32, i32)> for CalendarKey {
    fn from((day, month, year): (u32, u32, i32)) -> Self {
        Self { day, month, year }
    }
}
impl From<NaiveDate> for CalendarKey {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.day(), date.month(), date.year())
    }
}
impl From<&NaiveDateTime> for CalendarKey {
    fn from(t: &NaiveDateTime) -> Self {
        t.date().into()
    }
}
impl fmt::Display for CalendarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{}", self.day, self.month, self.year)
    }
}
impl FromStr for CalendarKey {
    type Err = FeatureError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y"))
            .map(CalendarKey::from)
            .map_err(|_| FeatureError::MalformedKey(s.to_string()))
    }
}

/// Boundaries of a selection of daily series, the end day being excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub start: CalendarKey,
    pub end: CalendarKey,
}
impl CalendarWindow {
    pub fn new(start: CalendarKey, end: CalendarKey) -> Self {
        Self { start, end }
    }
}

/// The gap-filled records of a column for one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub key: CalendarKey,
    pub index: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

/// Fills the absent values
///
/// Gaps are linearly interpolated, trailing absent values repeat the last present value
/// and leading absent values are set to 0.
/// Returns `None` if all the values are absent.
pub fn gap_fill(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    if present.is_empty() {
        return None;
    }
    let mut k = 0;
    Some(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if let Some(v) = v {
                    return *v;
                }
                while k < present.len() && present[k].0 < i {
                    k += 1;
                }
                match (k.checked_sub(1).map(|p| present[p]), present.get(k)) {
                    (Some((i0, v0)), Some(&(i1, v1))) => {
                        v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                    }
                    (Some((_, v0)), None) => v0,
                    _ => 0.,
                }
            })
            .collect(),
    )
}

/// Daily series of a column for a set of years
#[derive(Debug, Clone)]
pub struct CalendarFeatureAggregator {
    column: String,
    x_total: Vec<DailySeries>,
    lookup: HashMap<CalendarKey, usize>,
}
impl CalendarFeatureAggregator {
    /// Builds the daily series of `column` for each of the `years`
    ///
    /// Days without any present value are skipped.
    pub fn new(table: &ObservationTable, column: &str, years: &[i32]) -> Result<Self> {
        let values = table.column(column)?;
        let mut days: BTreeMap<(i32, u32, u32), Vec<usize>> = BTreeMap::new();
        table
            .index()
            .iter()
            .map(CalendarFeatures::from)
            .enumerate()
            .for_each(|(i, f)| {
                days.entry((f.year, f.month, f.day_of_month))
                    .or_default()
                    .push(i)
            });

        let mut x_total = vec![];
        for &year in years {
            for month in 1..=12 {
                for (_, rows) in days.range((year, month, 1)..=(year, month, 31)) {
                    let day_values: Vec<Option<f64>> = rows.iter().map(|&i| values[i]).collect();
                    let index: Vec<NaiveDateTime> =
                        rows.iter().map(|&i| table.index()[i]).collect();
                    let Some(key) = index.iter().max().map(CalendarKey::from) else {
                        continue;
                    };
                    match gap_fill(&day_values) {
                        Some(values) => x_total.push(DailySeries { key, index, values }),
                        None => log::warn!("skipping {}: no {} record", key, column),
                    }
                }
            }
        }
        let lookup = x_total
            .iter()
            .enumerate()
            .map(|(i, series)| (series.key, i))
            .collect();
        log::debug!(
            "{} daily series of {} for years {:?}",
            x_total.len(),
            column,
            years
        );
        Ok(Self {
            column: column.to_string(),
            x_total,
            lookup,
        })
    }
    pub fn column(&self) -> &str {
        &self.column
    }
    /// All the daily series
    pub fn x_total(&self) -> &[DailySeries] {
        &self.x_total
    }
    /// Calendar key to position in [x_total](Self::x_total)
    pub fn lookup(&self) -> &HashMap<CalendarKey, usize> {
        &self.lookup
    }
    pub fn position(&self, key: CalendarKey) -> Result<usize> {
        self.lookup
            .get(&key)
            .cloned()
            .ok_or(FeatureError::WindowBoundaryNotFound(key))
    }
    /// Returns the daily series from the window start (included) to the window end (excluded)
    ///
    /// The selection is empty if the end comes before the start.
    pub fn window(&self, window: CalendarWindow) -> Result<&[DailySeries]> {
        let CalendarWindow { start, end } = window;
        let (s, e) = (self.position(start)?, self.position(end)?);
        Ok(if e < s { &[] } else { &self.x_total[s..e] })
    }
}

/// Returns the values of daily series
pub fn to_samples(series: &[DailySeries]) -> Vec<Vec<f64>> {
    series.iter().map(|s| s.values.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(days: &[NaiveDate]) -> ObservationTable {
        let mut index = vec![];
        let mut so2 = vec![];
        for (k, date) in days.iter().enumerate() {
            let t0 = date.and_hms_opt(0, 0, 0).unwrap();
            for h in 0..24 {
                index.push(t0 + Duration::hours(h));
                so2.push(Some((k * 100 + h as usize) as f64));
            }
        }
        ObservationTable::new(index, vec![("so2", so2)]).unwrap()
    }

    #[test]
    fn window_positions() {
        let mut days: Vec<NaiveDate> = (26..=31).map(|d| day(2021, 1, d)).collect();
        days.extend((1..=4).map(|d| day(2021, 2, d)));
        days.push(day(2021, 2, 28));
        days.push(day(2021, 3, 1));
        let features = CalendarFeatureAggregator::new(&table(&days), "so2", &[2021]).unwrap();
        assert_eq!(features.x_total().len(), 12);
        assert_eq!(features.position(CalendarKey::new(31, 1, 2021)).unwrap(), 5);
        assert_eq!(features.position(CalendarKey::new(28, 2, 2021)).unwrap(), 10);
        let january_31 = CalendarKey::new(31, 1, 2021);
        let february_28 = CalendarKey::new(28, 2, 2021);
        let x_train = features
            .window(CalendarWindow::new(january_31, february_28))
            .unwrap();
        assert_eq!(x_train.len(), 5);
        assert_eq!(x_train[0].key, CalendarKey::new(31, 1, 2021));
        assert_eq!(x_train[4].key, CalendarKey::new(4, 2, 2021));
        assert!(features
            .window(CalendarWindow::new(february_28, january_31))
            .unwrap()
            .is_empty());
        assert!(matches!(
            features.window(CalendarWindow::new(january_31, CalendarKey::new(15, 2, 2021))),
            Err(FeatureError::WindowBoundaryNotFound(k)) if k == CalendarKey::new(15, 2, 2021)
        ));
    }

    #[test]
    fn year_major_order() {
        let days = [day(2020, 12, 31), day(2021, 1, 1), day(2022, 1, 1)];
        let table = table(&days);
        let features = CalendarFeatureAggregator::new(&table, "so2", &[2021, 2020]).unwrap();
        let keys: Vec<CalendarKey> = features.x_total().iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![CalendarKey::new(1, 1, 2021), CalendarKey::new(31, 12, 2020)]
        );
        assert!(features.x_total().iter().all(|s| s.values.len() == 24));
        for series in features.x_total() {
            assert!(series.index.iter().all(|t| CalendarKey::from(t) == series.key));
        }
        assert!(CalendarFeatureAggregator::new(&table, "no2", &[2021]).is_err());
    }

    #[test]
    fn filling() {
        assert_eq!(
            gap_fill(&[None, Some(1.), None, None, Some(4.), None]),
            Some(vec![0., 1., 2., 3., 4., 4.])
        );
        assert_eq!(gap_fill(&[Some(2.), Some(3.)]), Some(vec![2., 3.]));
        assert_eq!(gap_fill(&[None, None]), None);
        assert_eq!(gap_fill(&[]), None);
    }

    #[test]
    fn absent_day_is_skipped() {
        let t0 = day(2021, 6, 1).and_hms_opt(0, 0, 0).unwrap();
        let t1 = day(2021, 6, 2).and_hms_opt(0, 0, 0).unwrap();
        let table = ObservationTable::new(vec![t0, t1], vec![("so2", vec![None, Some(1.)])])
            .unwrap();
        let features = CalendarFeatureAggregator::new(&table, "so2", &[2021]).unwrap();
        assert_eq!(features.x_total().len(), 1);
        assert!(matches!(
            features.position(CalendarKey::new(1, 6, 2021)),
            Err(FeatureError::WindowBoundaryNotFound(_))
        ));
    }

    #[test]
    fn parse_keys() {
        assert_eq!(
            "2021-01-31".parse::<CalendarKey>().unwrap(),
            CalendarKey::new(31, 1, 2021)
        );
        assert_eq!(
            "28/02/2021".parse::<CalendarKey>().unwrap(),
            CalendarKey::new(28, 2, 2021)
        );
        assert!("2021-02-30".parse::<CalendarKey>().is_err());
        assert_eq!(CalendarKey::new(1, 2, 2021).to_string(), "01/02/2021");
    }
}
