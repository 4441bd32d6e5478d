//! # SO2 monitoring station analysis
//!
//! Parsing of air-quality station records into chronologically indexed tables,
//! daily peak classification, daily statistics and calendar-keyed daily series
//! for time-series clustering.
//!
//! The typical flow is
//!  - [StationLoader] reads the raw station files into an [ObservationTable],
//!  - [daily_segments] splits the table into calendar days,
//!  - [classify_peaks]/[classify_baseline] sort the days against a concentration threshold,
//!  - [daily_stats] reduces days to a `[day, statistic, column]` array,
//!  - [CalendarFeatureAggregator] builds the daily series fed to [clustering].
//!
//! [trend_profiles] and [correlation] support the exploratory analysis of the records.

pub mod calendar;
pub mod clustering;
mod error;
pub mod extract;
pub mod features;
pub mod loader;
pub mod peaks;
#[cfg(feature = "plot")]
pub mod plot;
pub mod segments;
pub mod stats;
pub mod table;
pub mod trends;

pub use calendar::{CalendarFeatures, CenturyRule, Hemisphere, Season, SeasonCalendar};
pub use clustering::{bench_k_means, BenchResult, KMeans, KMeansFit, MeanVarianceScaler};
pub use error::Error;
pub use extract::{
    dates_to_hours, filter_by_dates, hourly_values, Extracted, Extraction, HourlyProfile,
};
pub use features::{CalendarFeatureAggregator, CalendarKey, CalendarWindow, DailySeries};
pub use loader::StationLoader;
pub use peaks::{classify_baseline, classify_peaks, Classification, PeakCounts};
pub use segments::{daily_segments, DailySegment};
pub use stats::{
    correlation, daily_stats, describe_by, lag_pairs, Correlation, DailyStatistics, Describe,
    Resolution, Statistic,
};
pub use table::{ColumnCounts, ObservationTable};
pub use trends::{trend_profiles, Trend, TrendGroup};

/// Width of the `YYMMDD` date codes
pub const DATE_CODE_WIDTH: usize = 6;
/// Width of the `HHMM` time codes
pub const TIME_CODE_WIDTH: usize = 4;
/// Hourly SO2 concentration above which a day is a peak day [µg/m³]
pub const DEFAULT_PEAK_LEVEL: f64 = 350.;
