use chrono::NaiveDate;
use so2_monitors::{correlation, trend_profiles, ObservationTable, Trend};
use std::path::PathBuf;
use strum::IntoEnumIterator;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "so2-trends", about = "SO2 calendar trends and correlations")]
struct Opt {
    /// Path to the dataset pickle file
    dataset: PathBuf,
    /// Concentration column
    column: String,
    /// Calendar trends: month, week or year (all of them if none is given)
    #[structopt(short, long)]
    trend: Vec<Trend>,
    /// Restricts the month and week trends to one year of records
    #[structopt(short, long)]
    year: Option<i32>,
    /// Dataset columns of the correlation matrix (all of them if none is given)
    #[structopt(long)]
    keep: Vec<String>,
    /// Absolute values of the correlations
    #[structopt(long)]
    abs: bool,
    /// Lag of the lag plots, in records
    #[cfg(feature = "plot")]
    #[structopt(long, default_value = "1")]
    lag: usize,
    /// Plots the trends, the correlation matrix and the lag plots
    #[cfg(feature = "plot")]
    #[structopt(short, long)]
    plot: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let table = ObservationTable::from_pickle(&opt.dataset)?.select(&opt.keep)?;
    table.summary();

    let matrix = if opt.abs {
        correlation(&table).abs()
    } else {
        correlation(&table)
    };
    println!("CORRELATIONS WITH {}:", opt.column);
    for (column, r) in matrix.with(&opt.column)? {
        println!(" - {:24}: {:>6.2}", column, r);
    }

    let year_table = match opt.year {
        Some(year) => {
            let bounds = NaiveDate::from_ymd_opt(year, 1, 1)
                .zip(NaiveDate::from_ymd_opt(year, 12, 31))
                .and_then(|(from, to)| {
                    from.and_hms_opt(0, 0, 0)
                        .zip(to.and_hms_opt(23, 59, 59))
                });
            let Some((from, to)) = bounds else {
                anyhow::bail!("invalid year {}", year);
            };
            table.between(Some(from), to)
        }
        None => table.clone(),
    };
    let trends: Vec<Trend> = if opt.trend.is_empty() {
        Trend::iter().collect()
    } else {
        opt.trend.clone()
    };
    for trend in trends {
        let source = match trend {
            Trend::Month | Trend::Week => &year_table,
            Trend::Year => &table,
        };
        let groups = trend_profiles(source, &opt.column, trend)?;
        println!("{} TREND:", trend.to_string().to_uppercase());
        for group in &groups {
            let peak = group
                .mean
                .iter()
                .enumerate()
                .filter(|(_, x)| x.is_finite())
                .max_by(|a, b| a.1.total_cmp(b.1));
            match peak {
                Some((i, x)) => println!(
                    " - group {:>2}: {:>4} profiles, mean peak {:.2} at #{}",
                    group.group,
                    group.members.len(),
                    x,
                    i
                ),
                None => println!(
                    " - group {:>2}: {:>4} profiles, no record",
                    group.group,
                    group.members.len()
                ),
            }
        }

        #[cfg(feature = "plot")]
        if opt.plot {
            so2_monitors::plot::trend_plot(
                &groups,
                trend,
                &opt.column,
                format!("trend_{}.png", trend),
            )
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
    }

    #[cfg(feature = "plot")]
    if opt.plot {
        use so2_monitors::plot;
        plot::correlation_plot(&matrix, "correlation.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::lag_plot(&table, opt.lag, format!("lag_{}.png", opt.lag))
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}
