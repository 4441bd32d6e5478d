//! Timestamped observation table
//!
//! An [ObservationTable] is a chronological index with one or more numeric columns,
//! absent values being `None`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, time::Instant};

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("column {column:?} has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("column {0:?} appears more than once")]
    DuplicateColumn(String),
    #[error("column {0:?} not found")]
    ColumnNotFound(String),
    #[error("tables with different columns: {expected:?} and {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("timestamp {0} is not after the previous one")]
    UnorderedTimestamps(NaiveDateTime),
    #[error("failed to open the table file")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize the pickle table file")]
    Pickle(#[from] serde_pickle::Error),
    #[error("failed to write the CSV file")]
    Csv(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, TableError>;

/// Chronologically indexed numeric columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<String>,
    // column major
    values: Vec<Vec<Option<f64>>>,
}

/// Data availability of a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCounts {
    pub column: String,
    pub present: usize,
    pub absent: usize,
    /// # of hourly records between the earliest and the latest timestamp
    pub expected: usize,
    /// present records with respect to the expected ones [%]
    pub percent: f64,
}

impl ObservationTable {
    /// Creates a table from an index and (name, values) columns
    pub fn new<S: Into<String>>(
        index: Vec<NaiveDateTime>,
        columns: Vec<(S, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let mut this = Self {
            index,
            ..Default::default()
        };
        for (name, values) in columns {
            let name: String = name.into();
            if values.len() != this.index.len() {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected: this.index.len(),
                    found: values.len(),
                });
            }
            if this.columns.contains(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            this.columns.push(name);
            this.values.push(values);
        }
        Ok(this)
    }
    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }
    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }
    pub fn column_position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }
    /// Returns the values of column `name`
    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        let k = self.column_position(name)?;
        Ok(&self.values[k])
    }
    /// Iterator over the (name, values) columns
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> + '_ {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_slice()))
    }
    /// Returns the values of row `i` in column order
    pub fn row(&self, i: usize) -> Vec<Option<f64>> {
        self.values.iter().map(|v| v[i]).collect()
    }
    /// Returns the earliest and the latest timestamps
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.is_chronological() {
            self.index.first().cloned().zip(self.index.last().cloned())
        } else {
            self.index
                .iter()
                .min()
                .cloned()
                .zip(self.index.iter().max().cloned())
        }
    }
    /// Checks that the index is strictly increasing
    pub fn ensure_chronological(&self) -> Result<()> {
        match self.index.windows(2).find(|w| w[1] <= w[0]) {
            Some(w) => Err(TableError::UnorderedTimestamps(w[1])),
            None => Ok(()),
        }
    }
    pub fn is_chronological(&self) -> bool {
        self.ensure_chronological().is_ok()
    }
    /// Returns a table with the given columns, in the given order
    ///
    /// An empty selection keeps every column.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let mut columns = Vec::with_capacity(names.len());
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let k = self.column_position(name.as_ref())?;
            columns.push(self.columns[k].clone());
            values.push(self.values[k].clone());
        }
        Ok(Self {
            index: self.index.clone(),
            columns,
            values,
        })
    }
    /// Returns the table restricted to the rows `rows`, in that order
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|v| rows.iter().map(|&i| v[i]).collect())
                .collect(),
        }
    }
    /// Returns the rows with calendar date `date`
    pub fn day(&self, date: NaiveDate) -> Self {
        let rows: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, t)| t.date() == date)
            .map(|(i, _)| i)
            .collect();
        self.take(&rows)
    }
    /// Returns the rows with calendar date `date` of a chronological table
    ///
    /// The day bounds are found by bisection of the index.
    pub fn sorted_day(&self, date: NaiveDate) -> Self {
        let start = self.index.partition_point(|t| t.date() < date);
        let end = start + self.index[start..].partition_point(|t| t.date() == date);
        self.take(&(start..end).collect::<Vec<usize>>())
    }
    /// Returns the rows with timestamps within `[from, to]`, `from` being unbounded if `None`
    pub fn between(&self, from: Option<NaiveDateTime>, to: NaiveDateTime) -> Self {
        let rows: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, t)| **t <= to && from.map_or(true, |from| **t >= from))
            .map(|(i, _)| i)
            .collect();
        self.take(&rows)
    }
    /// Stacks tables with identical columns, keeping their timestamps
    pub fn concat(tables: &[Self]) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Ok(Self::default());
        };
        let mut this = Self {
            index: Vec::with_capacity(tables.iter().map(|t| t.len()).sum()),
            columns: first.columns.clone(),
            values: vec![vec![]; first.n_columns()],
        };
        for table in tables {
            if table.columns != this.columns {
                return Err(TableError::ColumnMismatch {
                    expected: this.columns.clone(),
                    found: table.columns.clone(),
                });
            }
            this.index.extend_from_slice(&table.index);
            this.values
                .iter_mut()
                .zip(table.values.iter())
                .for_each(|(a, b)| a.extend_from_slice(b));
        }
        Ok(this)
    }
    /// Data availability per column, assuming hourly records
    pub fn counts(&self) -> Vec<ColumnCounts> {
        let expected = self
            .time_range()
            .map_or(0, |(first, last)| (last - first).num_hours() as usize + 1);
        self.iter_columns()
            .map(|(column, values)| {
                let present = values.iter().filter(|v| v.is_some()).count();
                let percent = if expected > 0 {
                    (1e4 * present as f64 / expected as f64).round() / 1e2
                } else {
                    0.
                };
                ColumnCounts {
                    column: column.to_string(),
                    present,
                    absent: values.len() - present,
                    expected,
                    percent,
                }
            })
            .collect()
    }
    /// Prints out a table summary
    pub fn summary(&self) {
        println!("SUMMARY:");
        println!(" - # of records: {}", self.len());
        if let Some((first, last)) = self.time_range() {
            println!(" - time range: [{} - {}]", first, last);
        }
        println!(" - # of columns: {}", self.n_columns());
        println!(
            "    {:^24}: {:>8} {:>8} {:>8} {:>8}",
            "COLUMN", "PRESENT", "ABSENT", "EXPECTED", "%"
        );
        self.counts().iter().for_each(|c| {
            println!(
                "  - {:24}: {:>8} {:>8} {:>8} {:>8.2}",
                c.column, c.present, c.absent, c.expected, c.percent
            )
        });
    }
    /// Writes the table to a pickle file
    pub fn to_pickle<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        serde_pickle::to_writer(&mut file, self, Default::default())?;
        Ok(())
    }
    /// Loads a table from a pickle file
    pub fn from_pickle<P: AsRef<Path>>(path: P) -> Result<Self> {
        let now = Instant::now();
        let file = File::open(path.as_ref())?;
        log::info!("Loading {:?}...", path.as_ref());
        let this: Self = serde_pickle::from_reader(file, Default::default())?;
        log::info!(
            "... loaded {} records in {}ms",
            this.len(),
            now.elapsed().as_millis()
        );
        Ok(this)
    }
    /// Writes the table to a CSV file with a leading `timestamp` column
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        let mut keys = vec![String::from("timestamp")];
        keys.extend(self.columns.iter().cloned());
        wtr.write_record(&keys)?;
        for (i, t) in self.index.iter().enumerate() {
            let mut record = vec![t.format("%Y-%m-%d %H:%M:%S").to_string()];
            record.extend(
                self.values
                    .iter()
                    .map(|v| v[i].map_or_else(String::new, |x| format!("{}", x))),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hours(date: NaiveDate, n: u32) -> Vec<NaiveDateTime> {
        (0..n).map(|h| date.and_hms_opt(h, 0, 0).unwrap()).collect()
    }

    fn table() -> ObservationTable {
        let d1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let mut index = hours(d1, 3);
        index.extend(hours(d2, 2));
        ObservationTable::new(
            index,
            vec![
                ("so2", vec![Some(1.), None, Some(3.), Some(4.), Some(5.)]),
                ("wind", vec![Some(0.1), Some(0.2), Some(0.3), None, None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn construction() {
        let t = table();
        assert_eq!(t.len(), 5);
        assert_eq!(t.columns(), &["so2".to_string(), "wind".to_string()]);
        assert!(t.is_chronological());
        assert!(matches!(
            ObservationTable::new(t.index().to_vec(), vec![("a", vec![None])]),
            Err(TableError::LengthMismatch { .. })
        ));
        assert!(matches!(
            ObservationTable::new(
                vec![],
                vec![("a", vec![]), ("a", vec![])]
            ),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn unordered() {
        let t = table();
        let r = t.take(&[0, 2, 1]);
        assert!(matches!(
            r.ensure_chronological(),
            Err(TableError::UnorderedTimestamps(_))
        ));
    }

    #[test]
    fn selection() {
        let t = table();
        let s = t.select(&["wind"]).unwrap();
        assert_eq!(s.n_columns(), 1);
        assert_eq!(s.column("wind").unwrap()[2], Some(0.3));
        assert!(t.select(&["temp"]).is_err());
        assert_eq!(t.select::<&str>(&[]).unwrap(), t);
    }

    #[test]
    fn day_slice() {
        let t = table();
        let d = t.day(NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        assert_eq!(d.len(), 2);
        assert_eq!(d.row(0), vec![Some(4.), None]);
        assert!(t.day(NaiveDate::from_ymd_opt(2021, 1, 3).unwrap()).is_empty());
        for d in 0..4 {
            let date = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap() + Duration::days(d);
            assert_eq!(t.sorted_day(date), t.day(date));
        }
    }

    #[test]
    fn concatenation() {
        let t = table();
        let d2 = t.day(NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        let d1 = t.day(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        let c = ObservationTable::concat(&[d2, d1]).unwrap();
        assert_eq!(c.len(), 5);
        assert!(!c.is_chronological());
        assert_eq!(c.column("so2").unwrap()[0], Some(4.));
        let other = t.select(&["so2"]).unwrap();
        assert!(ObservationTable::concat(&[t, other]).is_err());
    }

    #[test]
    fn availability() {
        let counts = table().counts();
        // 2021-01-01 00:00 to 2021-01-02 01:00
        assert_eq!(counts[0].expected, 26);
        assert_eq!(counts[0].present, 4);
        assert_eq!(counts[0].absent, 1);
        assert_eq!(counts[1].present, 3);
        assert_eq!(counts[0].percent, 15.38);
    }

    #[test]
    fn unordered_availability() {
        let d1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let late = ObservationTable::new(hours(d2, 1), vec![("so2", vec![Some(1.)])]).unwrap();
        let early = ObservationTable::new(
            vec![
                d1.and_hms_opt(22, 0, 0).unwrap(),
                d1.and_hms_opt(23, 0, 0).unwrap(),
            ],
            vec![("so2", vec![Some(2.), None])],
        )
        .unwrap();
        let c = ObservationTable::concat(&[late, early]).unwrap();
        assert_eq!(
            c.time_range(),
            Some((
                d1.and_hms_opt(22, 0, 0).unwrap(),
                d2.and_hms_opt(0, 0, 0).unwrap()
            ))
        );
        let counts = c.counts();
        assert_eq!(counts[0].expected, 3);
        assert_eq!(counts[0].present, 2);
        assert_eq!(counts[0].percent, 66.67);
    }

    #[test]
    fn period() {
        let t = table();
        let to = NaiveDate::from_ymd_opt(2021, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(t.between(None, to).len(), 4);
        assert_eq!(t.between(Some(to - Duration::hours(22)), to).len(), 2);
        assert_eq!(t.between(Some(to - Duration::hours(1)), to).len(), 1);
    }

    #[test]
    fn pickle() {
        let t = table();
        let path = std::env::temp_dir().join("so2-monitors_table.pkl");
        t.to_pickle(&path).unwrap();
        let r = ObservationTable::from_pickle(&path).unwrap();
        assert_eq!(t, r);
    }

    #[test]
    fn csv() {
        let path = std::env::temp_dir().join("so2-monitors_table.csv");
        table().to_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("timestamp,so2,wind"));
        assert_eq!(lines.next(), Some("2021-01-01 00:00:00,1,0.1"));
        assert_eq!(lines.next(), Some("2021-01-01 01:00:00,,0.2"));
    }
}
