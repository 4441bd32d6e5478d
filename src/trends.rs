//! Calendar trends
//!
//! The records of a column are laid out as profiles over a calendar period:
//!  - [Trend::Month]: the 24 hourly values of each day, grouped by month,
//!  - [Trend::Week]: the 168 hourly values of each ISO week, Monday first,
//!  - [Trend::Year]: the 366 daily means of each year, in leap year day order.
//!
//! Each group carries its member profiles and their mean profile.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    calendar::CalendarFeatures,
    table::{ObservationTable, TableError},
};

#[derive(thiserror::Error, Debug)]
pub enum TrendError {
    #[error("failed to select the trend column")]
    Table(#[from] TableError),
}
type Result<T> = std::result::Result<T, TrendError>;

/// Calendar period of the profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Month,
    Week,
    Year,
}
impl Trend {
    /// Length of a profile
    pub fn profile_len(&self) -> usize {
        match self {
            Trend::Month => 24,
            Trend::Week => 7 * 24,
            Trend::Year => 366,
        }
    }
    /// Returns the (group, first day of the member, position in the profile) of a record
    fn locate(
        &self,
        features: &CalendarFeatures,
        date: NaiveDate,
    ) -> Option<(u32, NaiveDate, usize)> {
        match self {
            Trend::Month => Some((features.month, date, features.hour as usize)),
            Trend::Week => {
                let year = date.iso_week().year();
                let monday = NaiveDate::from_isoywd_opt(year, features.week, Weekday::Mon)?;
                let position = features.weekday.num_days_from_monday() as usize * 24
                    + features.hour as usize;
                Some((0, monday, position))
            }
            Trend::Year => {
                let first = NaiveDate::from_ymd_opt(features.year, 1, 1)?;
                let position =
                    NaiveDate::from_ymd_opt(2000, features.month, features.day_of_month)?
                        .ordinal0() as usize;
                Some((0, first, position))
            }
        }
    }
}

/// Profiles of one calendar group
#[derive(Debug, Clone, PartialEq)]
pub struct TrendGroup {
    /// month number for [Trend::Month], 0 otherwise
    pub group: u32,
    /// (first day, profile) with NaN for absent values
    pub members: Vec<(NaiveDate, Vec<f64>)>,
    /// mean of the present member values at each position
    pub mean: Vec<f64>,
}
impl TrendGroup {
    fn new(group: u32, members: BTreeMap<NaiveDate, Vec<(f64, usize)>>, len: usize) -> Self {
        let members: Vec<(NaiveDate, Vec<f64>)> = members
            .into_iter()
            .map(|(date, sums)| {
                let profile = sums
                    .into_iter()
                    .map(|(s, n)| if n > 0 { s / n as f64 } else { f64::NAN })
                    .collect();
                (date, profile)
            })
            .collect();
        let mean = (0..len)
            .map(|i| {
                let (s, n) = members
                    .iter()
                    .map(|(_, p)| p[i])
                    .filter(|x| x.is_finite())
                    .fold((0f64, 0usize), |(s, n), x| (s + x, n + 1));
                if n > 0 {
                    s / n as f64
                } else {
                    f64::NAN
                }
            })
            .collect();
        Self {
            group,
            members,
            mean,
        }
    }
}

/// Lays out the records of `column` as calendar profiles
///
/// Groups are sorted by group number and members by date.
pub fn trend_profiles(
    table: &ObservationTable,
    column: &str,
    trend: Trend,
) -> Result<Vec<TrendGroup>> {
    let values = table.column(column)?;
    let len = trend.profile_len();
    let mut groups: BTreeMap<u32, BTreeMap<NaiveDate, Vec<(f64, usize)>>> = BTreeMap::new();
    for (t, v) in table.index().iter().zip(values) {
        let features = CalendarFeatures::from(t);
        let Some((group, first, position)) = trend.locate(&features, t.date()) else {
            continue;
        };
        let sums = groups
            .entry(group)
            .or_default()
            .entry(first)
            .or_insert_with(|| vec![(0., 0); len]);
        if let Some(v) = v {
            let (s, n) = &mut sums[position];
            *s += v;
            *n += 1;
        }
    }
    log::info!("{} trend of {}: {} groups", trend, column, groups.len());
    Ok(groups
        .into_iter()
        .map(|(group, members)| TrendGroup::new(group, members, len))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        // a Monday
        NaiveDate::from_ymd_opt(2021, 1, 25)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table(n: i64) -> ObservationTable {
        ObservationTable::new(
            (0..n).map(|h| t0() + Duration::hours(h)).collect(),
            vec![(
                "so2",
                (0..n)
                    .map(|i| if i == 3 { None } else { Some((i % 24) as f64) })
                    .collect(),
            )],
        )
        .unwrap()
    }

    #[test]
    fn monthly() {
        // 2021-01-25 to 2021-02-03
        let groups = trend_profiles(&table(24 * 10), "so2", Trend::Month).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, 1);
        assert_eq!(groups[0].members.len(), 7);
        assert_eq!(groups[1].group, 2);
        assert_eq!(groups[1].members.len(), 3);
        assert!(groups[0].members[0].1[3].is_nan());
        assert_eq!(groups[0].members[1].1[3], 3.);
        assert_eq!(groups[0].mean[3], 3.);
        assert_eq!(groups[1].mean[23], 23.);
    }

    #[test]
    fn weekly() {
        let groups = trend_profiles(&table(24 * 10), "so2", Trend::Week).unwrap();
        assert_eq!(groups.len(), 1);
        let weeks = &groups[0].members;
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].0, NaiveDate::from_ymd_opt(2021, 2, 1).unwrap());
        assert_eq!(weeks[0].1.len(), 168);
        assert_eq!(weeks[1].1[24 + 5], 5.);
        // the second week stops on Wednesday
        assert!(weeks[1].1[3 * 24].is_nan());
        assert_eq!(groups[0].mean[3 * 24 + 1], 1.);
    }

    #[test]
    fn yearly() {
        let groups = trend_profiles(&table(48), "so2", Trend::Year).unwrap();
        assert_eq!(groups.len(), 1);
        let (first, profile) = &groups[0].members[0];
        assert_eq!(*first, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(profile.len(), 366);
        // Jan 25 misses the 03:00 record
        assert!((profile[24] - (276. - 3.) / 23.).abs() < 1e-12);
        assert_eq!(profile[25], 11.5);
        assert!(profile[26].is_nan());
        assert_eq!("week".parse::<Trend>().unwrap(), Trend::Week);
    }

    #[test]
    fn unknown_column() {
        assert!(trend_profiles(&table(24), "wind", Trend::Month).is_err());
    }
}
