//! Descriptive statistics
//!
//! [daily_stats] reduces each daily segment to its min, max, mean and standard deviation,
//! [describe_by] summarizes a column per hour, weekday, month or year.
//! [correlation] is the Pearson correlation matrix of the table columns.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rayon::prelude::*;
use std::{collections::BTreeMap, ops::Index};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    segments::DailySegment,
    table::{ObservationTable, TableError},
};

#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    #[error("segment #{segment} has columns {found:?}, expected {expected:?}")]
    ShapeMismatch {
        segment: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("failed to select the statistics column")]
    Table(#[from] TableError),
}
type Result<T> = std::result::Result<T, StatsError>;

/// Daily statistics, in the order of the statistics axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Std,
}
impl Statistic {
    pub const COUNT: usize = 4;
}

/// Min, max, mean and sample standard deviation of the present values
///
/// All are NaN if there is no present value, the standard deviation is NaN for a single value.
pub fn min_max_mean_std(values: &[Option<f64>]) -> [f64; Statistic::COUNT] {
    let present: Vec<f64> = values.iter().filter_map(|x| *x).collect();
    if present.is_empty() {
        return [f64::NAN; Statistic::COUNT];
    }
    let n = present.len() as f64;
    let min = present.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = present.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = present.iter().sum::<f64>() / n;
    let std = if present.len() > 1 {
        (present.iter().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / (n - 1.)).sqrt()
    } else {
        f64::NAN
    };
    [min, max, mean, std]
}

/// Statistics array with `[day, statistic, column]` axes
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStatistics {
    columns: Vec<String>,
    n_days: usize,
    data: Vec<f64>,
}
impl DailyStatistics {
    /// `[# of days, # of statistics, # of columns]`
    pub fn shape(&self) -> [usize; 3] {
        [self.n_days, Statistic::COUNT, self.columns.len()]
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn n_days(&self) -> usize {
        self.n_days
    }
    pub fn get(&self, day: usize, statistic: Statistic, column: usize) -> f64 {
        self[(day, statistic as usize, column)]
    }
    /// Returns the values of one statistic of one column for all days
    pub fn statistic(&self, statistic: Statistic, column: usize) -> Vec<f64> {
        (0..self.n_days)
            .map(|day| self.get(day, statistic, column))
            .collect()
    }
    /// Returns the `[statistic, column]` matrix of one day, row-wise
    pub fn day(&self, day: usize) -> &[f64] {
        let n = Statistic::COUNT * self.columns.len();
        &self.data[day * n..(day + 1) * n]
    }
}
impl Index<(usize, usize, usize)> for DailyStatistics {
    type Output = f64;

    fn index(&self, (day, statistic, column): (usize, usize, usize)) -> &Self::Output {
        let n_columns = self.columns.len();
        &self.data[(day * Statistic::COUNT + statistic) * n_columns + column]
    }
}

/// Computes the statistics of each column of each segment
///
/// The days axis follows the segments order.
/// All the segments must have the columns of the first one.
pub fn daily_stats(segments: &[DailySegment]) -> Result<DailyStatistics> {
    let columns: Vec<String> = segments
        .first()
        .map(|s| s.table.columns().to_vec())
        .unwrap_or_default();
    if let Some((segment, s)) = segments
        .iter()
        .enumerate()
        .find(|(_, s)| s.table.columns() != columns.as_slice())
    {
        return Err(StatsError::ShapeMismatch {
            segment,
            expected: columns,
            found: s.table.columns().to_vec(),
        });
    }
    let data: Vec<f64> = segments
        .par_iter()
        .map(|segment| {
            let stats: Vec<[f64; Statistic::COUNT]> = segment
                .table
                .iter_columns()
                .map(|(_, values)| min_max_mean_std(values))
                .collect();
            (0..Statistic::COUNT)
                .flat_map(|k| stats.iter().map(move |s| s[k]))
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<Vec<f64>>>()
        .concat();
    Ok(DailyStatistics {
        columns,
        n_days: segments.len(),
        data,
    })
}

/// Calendar grouping of [describe_by]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Resolution {
    Hour,
    /// from 0 (Monday) to 6 (Sunday)
    Weekday,
    Month,
    Year,
}
impl Resolution {
    fn key(&self, t: &NaiveDateTime) -> i32 {
        match self {
            Resolution::Hour => t.hour() as i32,
            Resolution::Weekday => t.weekday().num_days_from_monday() as i32,
            Resolution::Month => t.month() as i32,
            Resolution::Year => t.year(),
        }
    }
}

/// Summary statistics of a group of values
#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub group: i32,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}
impl Describe {
    fn new(group: i32, mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        let quantile = |q: f64| -> f64 {
            if values.is_empty() {
                return f64::NAN;
            }
            let pos = q * (values.len() - 1) as f64;
            let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
            values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
        };
        let [min, max, mean, std] =
            min_max_mean_std(&values.iter().map(|x| Some(*x)).collect::<Vec<_>>());
        Self {
            group,
            count: values.len(),
            mean,
            std,
            min,
            q25: quantile(0.25),
            median: quantile(0.5),
            q75: quantile(0.75),
            max,
        }
    }
}

/// Summarizes `column` per calendar group within `[from, to]`
pub fn describe_by(
    table: &ObservationTable,
    column: &str,
    resolution: Resolution,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Result<Vec<Describe>> {
    let values = table.column(column)?;
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    table
        .index()
        .iter()
        .zip(values)
        .filter(|(t, _)| from.map_or(true, |from| **t >= from) && to.map_or(true, |to| **t <= to))
        .for_each(|(t, v)| {
            let group = groups.entry(resolution.key(t)).or_default();
            if let Some(v) = v {
                group.push(*v);
            }
        });
    Ok(groups
        .into_iter()
        .map(|(group, values)| Describe::new(group, values))
        .collect())
}

/// Pearson correlation coefficient of the pairs where both values are present
///
/// NaN if there are less than 2 pairs or if either series is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(x, y)| x.zip(*y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let (mx, my) = pairs
        .iter()
        .fold((0f64, 0f64), |(a, b), (x, y)| (a + x / n, b + y / n));
    let (sxy, sxx, syy) = pairs.iter().fold((0f64, 0f64, 0f64), |(sxy, sxx, syy), (x, y)| {
        let (dx, dy) = (x - mx, y - my);
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    });
    if sxx == 0. || syy == 0. {
        f64::NAN
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1., 1.)
    }
}

/// Symmetric correlation matrix of the columns of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    columns: Vec<String>,
    data: Vec<f64>,
}
impl Correlation {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.columns.len() + j]
    }
    /// Absolute values of the coefficients
    pub fn abs(self) -> Self {
        Self {
            data: self.data.into_iter().map(f64::abs).collect(),
            ..self
        }
    }
    /// Correlations of every column with `column`, in descending order
    pub fn with(&self, column: &str) -> Result<Vec<(String, f64)>> {
        let i = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TableError::ColumnNotFound(column.to_string()))?;
        let mut row: Vec<(String, f64)> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| (c.clone(), self.get(i, j)))
            .collect();
        row.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(row)
    }
}

/// Computes the Pearson correlation matrix of the table columns
///
/// Each coefficient uses the rows where both columns are present.
pub fn correlation(table: &ObservationTable) -> Correlation {
    let columns: Vec<&[Option<f64>]> = table.iter_columns().map(|(_, v)| v).collect();
    let n = columns.len();
    let upper: Vec<(usize, usize, f64)> = (0..n)
        .flat_map(|i| (i..n).map(move |j| (i, j)))
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i, j)| (i, j, pearson(columns[i], columns[j])))
        .collect();
    let mut data = vec![f64::NAN; n * n];
    upper.into_iter().for_each(|(i, j, r)| {
        data[i * n + j] = r;
        data[j * n + i] = r;
    });
    Correlation {
        columns: table.columns().to_vec(),
        data,
    }
}

/// Pairs `(y[t], y[t + lag])` of present values
pub fn lag_pairs(values: &[Option<f64>], lag: usize) -> Vec<(f64, f64)> {
    values
        .iter()
        .zip(values.iter().skip(lag))
        .filter_map(|(a, b)| a.zip(*b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::daily_segments;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table() -> ObservationTable {
        let n = 48;
        ObservationTable::new(
            (0..n).map(|h| t0() + Duration::hours(h)).collect(),
            vec![
                ("const", vec![Some(2.5); n as usize]),
                (
                    "ramp",
                    (0..n)
                        .map(|i| if i % 24 == 0 { None } else { Some((i % 24) as f64) })
                        .collect(),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn constant_segment() {
        let segments = daily_segments::<&str>(&table(), &[]).unwrap();
        let stats = daily_stats(&segments).unwrap();
        assert_eq!(stats.shape(), [2, 4, 2]);
        for day in 0..2 {
            assert_eq!(stats.get(day, Statistic::Min, 0), 2.5);
            assert_eq!(stats.get(day, Statistic::Max, 0), 2.5);
            assert_eq!(stats.get(day, Statistic::Mean, 0), 2.5);
            assert_eq!(stats.get(day, Statistic::Std, 0), 0.);
        }
    }

    #[test]
    fn absent_values_are_ignored() {
        let segments = daily_segments::<&str>(&table(), &[]).unwrap();
        let stats = daily_stats(&segments).unwrap();
        assert_eq!(stats.get(1, Statistic::Min, 1), 1.);
        assert_eq!(stats.get(1, Statistic::Max, 1), 23.);
        assert_eq!(stats.get(1, Statistic::Mean, 1), 12.);
        // sample std of 1..=23
        assert!((stats.get(1, Statistic::Std, 1) - 46f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.statistic(Statistic::Max, 1), vec![23., 23.]);
        assert_eq!(stats.day(0)[2 * 2 + 1], 12.);
    }

    #[test]
    fn degenerate_columns() {
        assert!(min_max_mean_std(&[None, None]).iter().all(|x| x.is_nan()));
        let s = min_max_mean_std(&[Some(1.), None]);
        assert_eq!(&s[..3], &[1., 1., 1.]);
        assert!(s[3].is_nan());
    }

    #[test]
    fn shape_mismatch() {
        let table = table();
        let mut segments = daily_segments(&table, &["const", "ramp"]).unwrap();
        segments.extend(daily_segments(&table, &["ramp"]).unwrap());
        assert!(matches!(
            daily_stats(&segments),
            Err(StatsError::ShapeMismatch { segment: 2, .. })
        ));
        let stats = daily_stats(&[]).unwrap();
        assert_eq!(stats.shape(), [0, 4, 0]);
    }

    #[test]
    fn describe() {
        let table = table();
        let hourly = describe_by(&table, "ramp", Resolution::Hour, None, None).unwrap();
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[0].count, 0);
        assert!(hourly[0].mean.is_nan());
        assert_eq!(hourly[5].count, 2);
        assert_eq!(hourly[5].median, 5.);
        let daily = describe_by(
            &table,
            "ramp",
            Resolution::Weekday,
            Some(t0() + Duration::hours(24)),
            None,
        )
        .unwrap();
        // 2021-02-02 is a Tuesday
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].group, 1);
        assert_eq!(daily[0].count, 23);
        assert_eq!(daily[0].min, 1.);
        assert_eq!(daily[0].q25, 6.5);
        assert_eq!(daily[0].median, 12.);
        assert_eq!(daily[0].q75, 17.5);
        assert!(describe_by(&table, "wind", Resolution::Year, None, None).is_err());
        assert_eq!("month".parse::<Resolution>().unwrap(), Resolution::Month);
    }

    #[test]
    fn pearson_pairs() {
        let x = [Some(1.), Some(2.), None, Some(3.), Some(4.)];
        let y = [Some(2.), Some(4.), Some(100.), Some(6.), None];
        assert!((pearson(&x, &y) - 1.).abs() < 1e-12);
        let z = [Some(3.), Some(2.), Some(1.), None, Some(0.)];
        assert!((pearson(&x, &z) + 1.).abs() < 1e-12);
        assert!(pearson(&x, &[Some(1.); 5]).is_nan());
        assert!(pearson(&[Some(1.)], &[Some(2.)]).is_nan());
    }

    #[test]
    fn correlation_matrix() {
        let n = 24;
        let table = ObservationTable::new(
            (0..n).map(|h| t0() + Duration::hours(h)).collect(),
            vec![
                ("so2", (0..n).map(|i| Some(i as f64)).collect()),
                ("wind", (0..n).map(|i| Some(-2. * i as f64)).collect()),
                ("temp", (0..n).map(|i| Some((i % 2) as f64)).collect()),
            ],
        )
        .unwrap();
        let r = correlation(&table);
        assert_eq!(r.columns().len(), 3);
        assert!((r.get(0, 0) - 1.).abs() < 1e-12);
        assert!((r.get(0, 1) + 1.).abs() < 1e-12);
        assert_eq!(r.get(0, 2), r.get(2, 0));
        let ranked = r.clone().abs().with("so2").unwrap();
        assert_eq!(ranked[2].0, "temp");
        assert!((ranked[0].1 - 1.).abs() < 1e-12);
        let ranked = r.with("so2").unwrap();
        assert_eq!(ranked[2].0, "wind");
        assert!(r.with("rain").is_err());
    }

    #[test]
    fn lagged() {
        let values = [Some(1.), Some(2.), None, Some(4.), Some(5.)];
        assert_eq!(lag_pairs(&values, 1), vec![(1., 2.), (4., 5.)]);
        assert_eq!(lag_pairs(&values, 3), vec![(1., 4.), (2., 5.)]);
        assert!(lag_pairs(&values, 5).is_empty());
    }
}
