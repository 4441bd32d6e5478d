//! Calendar conventions
//!
//! Station records carry the date as a `YYMMDD` code and the time as a `HHMM` code,
//! both stored as integers so leading zeros are lost.
//! [CenturyRule] turns the code pairs into timestamps and [SeasonCalendar] maps dates to seasons.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use strum_macros::{Display, EnumIter};

use crate::{DATE_CODE_WIDTH, TIME_CODE_WIDTH};

#[derive(thiserror::Error, Debug)]
pub enum CalendarError {
    #[error("malformed timestamp from date code {date_code:?} and time code {time_code:?}")]
    MalformedTimestamp {
        date_code: String,
        time_code: String,
        #[source]
        source: chrono::ParseError,
    },
}
type Result<T> = std::result::Result<T, CalendarError>;

/// Left pads `code` with zeros up to `width` characters
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{:0>width$}", code.trim(), width = width)
}

/// Two digits year to century resolution
///
/// Date codes starting with the legacy digit belong to the 1900s, all others to the 2000s.
#[derive(Debug, Clone, Copy)]
pub struct CenturyRule {
    legacy_digit: char,
}
impl Default for CenturyRule {
    fn default() -> Self {
        Self { legacy_digit: '9' }
    }
}
impl CenturyRule {
    pub fn legacy_digit(self, legacy_digit: char) -> Self {
        Self { legacy_digit }
    }
    /// Prefixes a padded date code (or date and time string) with its century
    pub fn resolve(&self, padded: &str) -> String {
        if padded.starts_with(self.legacy_digit) {
            format!("19{}", padded)
        } else {
            format!("20{}", padded)
        }
    }
    /// Builds the timestamp of a date code and a time code
    pub fn timestamp(&self, date_code: &str, time_code: &str) -> Result<NaiveDateTime> {
        let stamp = self.resolve(&format!(
            "{} {}",
            pad_code(date_code, DATE_CODE_WIDTH),
            pad_code(time_code, TIME_CODE_WIDTH)
        ));
        NaiveDateTime::parse_from_str(&stamp, "%Y%m%d %H%M").map_err(|source| {
            CalendarError::MalformedTimestamp {
                date_code: date_code.to_string(),
                time_code: time_code.to_string(),
                source,
            }
        })
    }
    /// Returns the chronological index of a sequence of (date code, time code) pairs
    ///
    /// The index keeps the order of the codes.
    pub fn index<'a, I>(&self, codes: I) -> Result<Vec<NaiveDateTime>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        codes
            .into_iter()
            .map(|(date_code, time_code)| self.timestamp(date_code, time_code))
            .collect()
    }
}

/// Seasons of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}
impl Season {
    /// The season at the same time of the year in the other hemisphere
    pub fn opposite(self) -> Self {
        match self {
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
            Season::Winter => Season::Summer,
            Season::Spring => Season::Autumn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hemisphere {
    #[default]
    Southern,
    Northern,
}

/// Astronomical season boundaries as (month, day) pairs
///
/// A boundary day belongs to the season that ends on it.
#[derive(Debug, Clone, Copy)]
pub struct SeasonCalendar {
    december_solstice: (u32, u32),
    march_equinox: (u32, u32),
    june_solstice: (u32, u32),
    september_equinox: (u32, u32),
    hemisphere: Hemisphere,
}
impl Default for SeasonCalendar {
    fn default() -> Self {
        Self {
            december_solstice: (12, 21),
            march_equinox: (3, 20),
            june_solstice: (6, 21),
            september_equinox: (9, 23),
            hemisphere: Hemisphere::Southern,
        }
    }
}
impl SeasonCalendar {
    pub fn hemisphere(self, hemisphere: Hemisphere) -> Self {
        Self { hemisphere, ..self }
    }
    pub fn december_solstice(self, month: u32, day: u32) -> Self {
        Self {
            december_solstice: (month, day),
            ..self
        }
    }
    pub fn march_equinox(self, month: u32, day: u32) -> Self {
        Self {
            march_equinox: (month, day),
            ..self
        }
    }
    pub fn june_solstice(self, month: u32, day: u32) -> Self {
        Self {
            june_solstice: (month, day),
            ..self
        }
    }
    pub fn september_equinox(self, month: u32, day: u32) -> Self {
        Self {
            september_equinox: (month, day),
            ..self
        }
    }
    /// Returns the season of `date`
    pub fn season(&self, date: NaiveDate) -> Season {
        let md = (date.month(), date.day());
        let southern = if md > self.december_solstice || md <= self.march_equinox {
            Season::Summer
        } else if md <= self.june_solstice {
            Season::Autumn
        } else if md <= self.september_equinox {
            Season::Winter
        } else {
            Season::Spring
        };
        match self.hemisphere {
            Hemisphere::Southern => southern,
            Hemisphere::Northern => southern.opposite(),
        }
    }
    /// Returns the seasons of a list of dates
    pub fn seasons(&self, dates: &[NaiveDate]) -> Vec<Season> {
        dates.iter().map(|&date| self.season(date)).collect()
    }
}

/// Calendar attributes of a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    /// ISO week number
    pub week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: Weekday,
    pub hour: u32,
}
impl From<&NaiveDateTime> for CalendarFeatures {
    fn from(timestamp: &NaiveDateTime) -> Self {
        Self {
            week: timestamp.iso_week().week(),
            day_of_month: timestamp.day(),
            month: timestamp.month(),
            year: timestamp.year(),
            weekday: timestamp.weekday(),
            hour: timestamp.hour(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn padding() {
        assert_eq!(pad_code("10101", DATE_CODE_WIDTH), "010101");
        assert_eq!(pad_code("100", TIME_CODE_WIDTH), "0100");
        assert_eq!(pad_code("0", TIME_CODE_WIDTH), "0000");
        assert_eq!(pad_code("1234567", DATE_CODE_WIDTH), "1234567");
    }

    #[test]
    fn century() {
        let rule = CenturyRule::default();
        let t = rule.timestamp("991231", "2300").unwrap();
        assert_eq!(t.date(), date(1999, 12, 31));
        assert_eq!(t.hour(), 23);
        let t = rule.timestamp("210101", "0").unwrap();
        assert_eq!(t.date(), date(2021, 1, 1));
        assert_eq!(t.hour(), 0);
        let t = rule.timestamp("50607", "100").unwrap();
        assert_eq!(t, date(2005, 6, 7).and_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn custom_century() {
        let rule = CenturyRule::default().legacy_digit('8');
        let t = rule.timestamp("850101", "0").unwrap();
        assert_eq!(t.date(), date(1985, 1, 1));
        let t = rule.timestamp("991231", "0").unwrap();
        assert_eq!(t.date(), date(2099, 12, 31));
    }

    #[test]
    fn malformed() {
        let rule = CenturyRule::default();
        assert!(matches!(
            rule.timestamp("211301", "0000"),
            Err(CalendarError::MalformedTimestamp { .. })
        ));
        assert!(rule.timestamp("210101", "2561").is_err());
        assert!(rule.timestamp("21a101", "0000").is_err());
    }

    #[test]
    fn index_keeps_order() {
        let index = CenturyRule::default()
            .index([("210102", "100"), ("210101", "2300")])
            .unwrap();
        assert!(index[0] > index[1]);
    }

    #[test]
    fn southern_seasons() {
        let seasons = SeasonCalendar::default();
        assert_eq!(seasons.season(date(2021, 12, 22)), Season::Summer);
        assert_eq!(seasons.season(date(2021, 3, 20)), Season::Summer);
        assert_eq!(seasons.season(date(2021, 3, 21)), Season::Autumn);
        assert_eq!(seasons.season(date(2021, 6, 21)), Season::Autumn);
        assert_eq!(seasons.season(date(2021, 7, 15)), Season::Winter);
        assert_eq!(seasons.season(date(2021, 9, 23)), Season::Winter);
        assert_eq!(seasons.season(date(2021, 9, 24)), Season::Spring);
        assert_eq!(seasons.season(date(2021, 12, 21)), Season::Spring);
        assert_eq!(seasons.season(date(2021, 1, 1)), Season::Summer);
    }

    #[test]
    fn northern_seasons() {
        let seasons = SeasonCalendar::default().hemisphere(Hemisphere::Northern);
        assert_eq!(seasons.season(date(2021, 7, 15)), Season::Summer);
        assert_eq!(seasons.season(date(2021, 1, 15)), Season::Winter);
        assert_eq!(seasons.season(date(2021, 4, 15)), Season::Spring);
    }

    #[test]
    fn features() {
        let t = date(2021, 1, 4).and_hms_opt(13, 0, 0).unwrap();
        let f = CalendarFeatures::from(&t);
        assert_eq!(f.week, 1);
        assert_eq!(f.day_of_month, 4);
        assert_eq!(f.month, 1);
        assert_eq!(f.year, 2021);
        assert_eq!(f.weekday, Weekday::Mon);
        assert_eq!(f.hour, 13);
    }
}
