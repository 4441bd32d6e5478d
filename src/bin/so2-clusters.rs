use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;
use so2_monitors::{
    clustering::{cluster_sizes, weekday_distribution},
    features::to_samples,
    BenchResult, CalendarFeatureAggregator, CalendarKey, CalendarWindow, KMeans,
    ObservationTable,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "so2-clusters", about = "SO2 daily profiles clustering")]
struct Opt {
    /// Path to the dataset pickle file
    dataset: PathBuf,
    /// Concentration column of the daily profiles
    column: String,
    /// Years of daily profiles
    #[structopt(short, long, required = true)]
    year: Vec<i32>,
    /// First day of the clustered profiles (YYYY-MM-DD or DD/MM/YYYY)
    #[structopt(short, long)]
    start: CalendarKey,
    /// Day following the last clustered profile (YYYY-MM-DD or DD/MM/YYYY)
    #[structopt(short, long)]
    end: CalendarKey,
    /// Numbers of clusters (from 2 to 8 if none is given)
    #[structopt(short, long)]
    k: Vec<usize>,
    /// Seed of the k-means++ initialization
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Plots the clusters of the best silhouette fit
    #[cfg(feature = "plot")]
    #[structopt(short, long)]
    plot: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let table = ObservationTable::from_pickle(&opt.dataset)?;
    let features = CalendarFeatureAggregator::new(&table, &opt.column, &opt.year)?;
    println!(
        "{} daily profiles of {} in {}",
        features.x_total().len(),
        features.column(),
        opt.year.iter().join(", ")
    );
    let window = features.window(CalendarWindow::new(opt.start, opt.end))?;
    if window.is_empty() {
        anyhow::bail!("no daily profile from {} to {}", opt.start, opt.end);
    }
    println!(
        "{} daily profiles from {} to {}",
        window.len(),
        opt.start,
        opt.end
    );
    let x_train = to_samples(window);

    let ks = if opt.k.is_empty() {
        (2..=8).collect()
    } else {
        opt.k.clone()
    };
    let pb = ProgressBar::new(ks.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} fits")?);
    let results = ks
        .par_iter()
        .progress_with(pb)
        .map(|&k| BenchResult::new("k-means++", &KMeans::new(k).seed(opt.seed), &x_train))
        .collect::<Result<Vec<BenchResult>, _>>()?;

    println!("{}", "-".repeat(72));
    println!("{}", BenchResult::header());
    results.iter().for_each(|r| println!("{}", r));
    println!("{}", "-".repeat(72));

    let Some(best) = results
        .iter()
        .max_by(|a, b| a.silhouette.total_cmp(&b.silhouette))
    else {
        return Ok(());
    };
    println!("Best silhouette with {} clusters", best.n_clusters);
    let sizes = cluster_sizes(&best.fit.labels);
    let dates: Vec<_> = window
        .iter()
        .filter_map(|s| s.index.first().map(|t| t.date()))
        .collect();
    let distribution = weekday_distribution(&best.fit.labels, &dates)?;
    for (k, (n, days)) in sizes.iter().zip(&distribution).enumerate() {
        println!(
            " - cluster #{}: {:>4} days, Mon-Sun: {}",
            k,
            n,
            days.iter().join(" ")
        );
    }

    #[cfg(feature = "plot")]
    if opt.plot {
        use so2_monitors::{plot, MeanVarianceScaler};
        plot::series_by_cluster_plot(
            &best.fit.labels,
            &MeanVarianceScaler.transform(&x_train),
            &best.fit.centers,
            "series_by_cluster.png",
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::cluster_centers_plot(&best.fit.centers, "cluster_centers.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::cluster_distribution_plot(&sizes, "cluster_distribution.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        plot::weekly_cluster_distribution_plot(&distribution, "weekly_cluster_distribution.png")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}
