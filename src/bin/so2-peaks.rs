use itertools::Itertools;
use so2_monitors::{
    classify_baseline, classify_peaks, daily_segments, daily_stats, dates_to_hours, describe_by,
    filter_by_dates, DailyStatistics, Extraction, Hemisphere, ObservationTable, PeakCounts,
    Resolution, SeasonCalendar, Statistic, DEFAULT_PEAK_LEVEL,
};
use std::path::PathBuf;
use strum::IntoEnumIterator;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "so2-peaks", about = "SO2 peak days analysis")]
struct Opt {
    /// Path to the dataset pickle file
    dataset: PathBuf,
    /// Concentration column the peak days are detected on
    column: String,
    /// Concentration level above which a day is a peak day
    #[structopt(short, long, default_value = "350")]
    threshold: f64,
    /// Dataset columns (all of them if none is given)
    #[structopt(long)]
    keep: Vec<String>,
    /// Summarizes the column per hour, weekday, month or year
    #[structopt(short, long)]
    describe: Option<Resolution>,
    /// Northern hemisphere seasons
    #[structopt(long)]
    northern: bool,
    /// Prints the hourly records of the peak days
    #[structopt(long)]
    hourly: bool,
    /// Saves the records of the peak days to a CSV file
    #[structopt(long)]
    export: Option<PathBuf>,
    /// Plots the daily statistic of peak and baseline days
    #[cfg(feature = "plot")]
    #[structopt(short, long)]
    plot: Option<Statistic>,
}

fn nan_mean(values: &[f64]) -> f64 {
    let present: Vec<f64> = values.iter().cloned().filter(|x| x.is_finite()).collect();
    present.iter().sum::<f64>() / present.len() as f64
}

fn print_stats(peaks: &DailyStatistics, baseline: &DailyStatistics) {
    println!("DAILY STATISTICS (peak days / baseline days average):");
    println!(
        "{:>24}: {}",
        "",
        Statistic::iter().map(|s| format!("{:>21}", s)).join("")
    );
    for (k, column) in peaks.columns().iter().enumerate() {
        let j = baseline.columns().iter().position(|c| c == column);
        println!(
            "{:>24}: {}",
            column,
            Statistic::iter()
                .map(|s| {
                    let base = j.map_or(f64::NAN, |j| nan_mean(&baseline.statistic(s, j)));
                    format!("{:>10.2}/{:<10.2}", nan_mean(&peaks.statistic(s, k)), base)
                })
                .join("")
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    if opt.threshold != DEFAULT_PEAK_LEVEL {
        log::info!(
            "peak level set to {} instead of {}",
            opt.threshold,
            DEFAULT_PEAK_LEVEL
        );
    }

    let table = ObservationTable::from_pickle(&opt.dataset)?;
    table.summary();

    let segments = daily_segments(&table, &opt.keep)?;
    let peaks = classify_peaks(&segments, &opt.column, opt.threshold)?;
    let baseline = classify_baseline(&segments, &opt.column, opt.threshold)?;
    let calendar = if opt.northern {
        SeasonCalendar::default().hemisphere(Hemisphere::Northern)
    } else {
        SeasonCalendar::default()
    };
    let counts = PeakCounts::new(&peaks, &baseline, &calendar);
    counts.summary();

    let peak_stats = daily_stats(&peaks.segments)?;
    let baseline_stats = daily_stats(&baseline.segments)?;
    print_stats(&peak_stats, &baseline_stats);

    if let Some(resolution) = opt.describe {
        println!("{} SUMMARY PER {}:", opt.column, resolution.to_string().to_uppercase());
        println!(
            "{:>6} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            resolution, "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for d in describe_by(&table, &opt.column, resolution, None, None)? {
            println!(
                "{:>6} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                d.group, d.count, d.mean, d.std, d.min, d.q25, d.median, d.q75, d.max
            );
        }
    }

    if opt.hourly {
        let days = filter_by_dates(&table, &peaks.dates, Extraction::List)?
            .into_list()
            .unwrap_or_default();
        for (date, profile) in peaks.dates.iter().zip(dates_to_hours(&days)) {
            let Some(k) = profile.columns.iter().position(|c| *c == opt.column) else {
                continue;
            };
            println!(
                "{}: {}",
                date,
                profile
                    .rows
                    .iter()
                    .map(|(hour, values)| match values[k] {
                        Some(v) => format!("{:02}h {:.0}", hour, v),
                        None => format!("{:02}h -", hour),
                    })
                    .join(" | ")
            );
        }
    }

    if let Some(path) = &opt.export {
        let records = filter_by_dates(&table, &peaks.dates, Extraction::Table)?;
        if let Some(records) = records.into_table() {
            records.to_csv(path)?;
            println!("{} peak days records saved to {:?}", records.len(), path);
        }
    }

    #[cfg(feature = "plot")]
    if let Some(statistic) = opt.plot {
        use so2_monitors::{hourly_values, plot};
        let hourly = |segments: &[so2_monitors::DailySegment]| {
            let tables: Vec<ObservationTable> =
                segments.iter().map(|s| s.table.clone()).collect();
            hourly_values(&dates_to_hours(&tables), &opt.column)
        };
        plot::hourly_cumdistr_comparison(
            &hourly(&peaks.segments),
            &hourly(&baseline.segments),
            &opt.column,
            "hourly_cumdistr.png",
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::peak_counts_plot(&counts, "peak_counts.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::cumdistr_comparison(
            &peak_stats,
            &baseline_stats,
            statistic,
            format!("cumdistr_{}.png", statistic),
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::hist_plot(&table, &opt.column, 50, "histogram.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}
