//! Peak days
//!
//! A peak day is a day where the concentration exceeds a given level at least once.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::{
    calendar::{Season, SeasonCalendar},
    segments::DailySegment,
    table::TableError,
};

type Result<T> = std::result::Result<T, TableError>;

/// Daily segments selected by a threshold and their dates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub segments: Vec<DailySegment>,
    /// date of the first record of each segment
    pub dates: Vec<NaiveDate>,
}
impl Classification {
    pub fn len(&self) -> usize {
        self.segments.len()
    }
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Checks if any present value of `column` is strictly greater than `threshold`
fn exceeds(segment: &DailySegment, column: &str, threshold: f64) -> Result<bool> {
    Ok(segment.present(column)?.any(|x| x > threshold))
}

fn classify(
    segments: &[DailySegment],
    column: &str,
    threshold: f64,
    peak: bool,
) -> Result<Classification> {
    let mut classification = Classification::default();
    for segment in segments {
        if exceeds(segment, column, threshold)? == peak {
            let date = segment
                .table
                .index()
                .first()
                .map_or(segment.date, |t| t.date());
            classification.dates.push(date);
            classification.segments.push(segment.clone());
        }
    }
    Ok(classification)
}

/// Returns the days where `column` exceeds `threshold` at least once
pub fn classify_peaks(
    segments: &[DailySegment],
    column: &str,
    threshold: f64,
) -> Result<Classification> {
    let peaks = classify(segments, column, threshold, true)?;
    log::debug!(
        "{} peak days out of {} above {}",
        peaks.len(),
        segments.len(),
        threshold
    );
    Ok(peaks)
}

/// Returns the days where `column` never exceeds `threshold`
///
/// Days without any present value are baseline days.
pub fn classify_baseline(
    segments: &[DailySegment],
    column: &str,
    threshold: f64,
) -> Result<Classification> {
    classify(segments, column, threshold, false)
}

/// Peak days tallies
#[derive(Debug, Clone, PartialEq)]
pub struct PeakCounts {
    pub peak_days: usize,
    pub baseline_days: usize,
    /// # of peak days from Monday to Sunday
    pub weekdays: [usize; 7],
    pub seasons: BTreeMap<Season, usize>,
}
impl PeakCounts {
    pub fn new(peaks: &Classification, baseline: &Classification, calendar: &SeasonCalendar) -> Self {
        let mut weekdays = [0usize; 7];
        let mut seasons: BTreeMap<Season, usize> = Season::iter().map(|s| (s, 0)).collect();
        for &date in &peaks.dates {
            weekdays[date.weekday().num_days_from_monday() as usize] += 1;
            *seasons.entry(calendar.season(date)).or_default() += 1;
        }
        Self {
            peak_days: peaks.len(),
            baseline_days: baseline.len(),
            weekdays,
            seasons,
        }
    }
    /// Prints out the tallies
    pub fn summary(&self) {
        let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        println!("PEAK DAYS:");
        println!(" - # of peak days    : {}", self.peak_days);
        println!(" - # of baseline days: {}", self.baseline_days);
        println!(" - per weekday:");
        days.iter()
            .zip(self.weekdays.iter())
            .for_each(|(day, n)| println!("  - {:8}: {:>6}", day, n));
        println!(" - per season:");
        self.seasons
            .iter()
            .for_each(|(season, n)| println!("  - {:8}: {:>6}", season.to_string(), n));
    }
}
