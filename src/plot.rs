//! Diagnostic charts
//!
//! Each chart is written to a PNG file, or to a SVG file if the file name ends with `.svg`.

use chrono::NaiveDateTime;
use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use std::path::Path;

use crate::{
    peaks::PeakCounts,
    stats::{lag_pairs, Correlation, DailyStatistics, Statistic},
    table::ObservationTable,
    trends::{Trend, TrendGroup},
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const SIZE: (u32, u32) = (768, 512);

macro_rules! render {
    ($filename:expr, $size:expr, $draw:ident, $($arg:expr),*) => {{
        let path: &Path = $filename.as_ref();
        log::info!("Plotting {:?}", path);
        if path.extension().map_or(false, |ext| ext == "svg") {
            $draw(SVGBackend::new(path, $size).into_drawing_area(), $($arg),*)
        } else {
            $draw(BitMapBackend::new(path, $size).into_drawing_area(), $($arg),*)
        }
    }};
}

fn tableau(i: usize) -> RGBColor {
    let color = colorous::TABLEAU10[i % colorous::TABLEAU10.len()];
    RGBColor(color.r, color.g, color.b)
}

fn minmax<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold(None, |mm, &x| match mm {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
        .map(|(lo, hi)| if hi > lo { (lo, hi) } else { (lo - 1., hi + 1.) })
}

fn legend<'a, DB: DrawingBackend + 'a, CT: CoordTranslate>(
    chart: &mut ChartContext<'a, DB, CT>,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    Ok(())
}

/// Splits a line at the absent values
fn runs<I: IntoIterator<Item = (f64, Option<f64>)>>(points: I) -> Vec<Vec<(f64, f64)>> {
    let mut run = vec![];
    let mut runs = vec![];
    for (x, y) in points {
        match y {
            Some(y) if y.is_finite() => run.push((x, y)),
            _ if !run.is_empty() => runs.push(std::mem::take(&mut run)),
            _ => (),
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

fn hours_since(t0: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - t0).num_minutes() as f64 / 60.
}

fn draw_series<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    table: &ObservationTable,
    columns: &[&str],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let Some((t0, t1)) = table.time_range() else {
        return Ok(());
    };
    let mut values = vec![];
    for &name in columns {
        values.push((name, table.column(name)?));
    }
    let Some((lo, hi)) = minmax(
        values
            .iter()
            .flat_map(|(_, v)| v.iter().filter_map(|x| x.as_ref())),
    ) else {
        return Ok(());
    };
    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..hours_since(t0, t1).max(1.), lo..hi)?;
    chart
        .configure_mesh()
        .x_desc(format!("Time since {} [h]", t0))
        .y_desc("Concentration")
        .draw()?;
    for (k, (name, column)) in values.into_iter().enumerate() {
        let rgb = tableau(k);
        let runs = runs(
            table
                .index()
                .iter()
                .zip(column)
                .map(|(&t, v)| (hours_since(t0, t), *v)),
        );
        for (i, run) in runs.into_iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(run, &rgb))?;
            if i == 0 {
                series
                    .label(name)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
            }
        }
    }
    legend(&mut chart)
}
/// Plots the records of `columns`
pub fn series_plot<P: AsRef<Path>>(
    table: &ObservationTable,
    columns: &[&str],
    filename: P,
) -> Result<()> {
    render!(filename, SIZE, draw_series, table, columns)
}

fn draw_hist<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    table: &ObservationTable,
    column: &str,
    n_bins: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let values: Vec<f64> = table.column(column)?.iter().filter_map(|x| *x).collect();
    let (Some((lo, hi)), true) = (minmax(&values), n_bins > 0) else {
        return Ok(());
    };
    let width = (hi - lo) / n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    values
        .iter()
        .for_each(|x| counts[(((x - lo) / width) as usize).min(n_bins - 1)] += 1);
    let y_max = counts.iter().cloned().max().unwrap_or(0) as f64;
    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(lo..hi, 0f64..y_max * 1.1)?;
    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Count")
        .draw()?;
    let rgb = tableau(0);
    chart.draw_series(counts.iter().enumerate().map(|(i, &n)| {
        let x = lo + i as f64 * width;
        Rectangle::new([(x, 0.), (x + width, n as f64)], rgb.filled())
    }))?;
    Ok(())
}
/// Plots the histogram of the present values of `column`
pub fn hist_plot<P: AsRef<Path>>(
    table: &ObservationTable,
    column: &str,
    n_bins: usize,
    filename: P,
) -> Result<()> {
    render!(filename, SIZE, draw_hist, table, column, n_bins)
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    names: &[String],
    values: &[usize],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if values.is_empty() {
        return Ok(());
    }
    let n = values.len() as u32;
    let y_max = values.iter().cloned().max().unwrap_or(0) as u32 + 1;
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d((0u32..n).into_segmented(), 0u32..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Count")
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(tableau(0).filled())
            .margin(10)
            .data(values.iter().enumerate().map(|(i, &v)| (i as u32, v as u32))),
    )?;
    Ok(())
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn draw_peak_counts<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    counts: &PeakCounts,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 3));
    draw_bars(
        &panels[0],
        "Days",
        &["peak".to_string(), "baseline".to_string()],
        &[counts.peak_days, counts.baseline_days],
    )?;
    draw_bars(
        &panels[1],
        "Peak days per weekday",
        &WEEKDAYS.map(String::from),
        &counts.weekdays,
    )?;
    let (seasons, n): (Vec<String>, Vec<usize>) = counts
        .seasons
        .iter()
        .map(|(season, n)| (season.to_string(), *n))
        .unzip();
    draw_bars(&panels[2], "Peak days per season", &seasons, &n)
}
/// Plots the peak and baseline days tallies
pub fn peak_counts_plot<P: AsRef<Path>>(counts: &PeakCounts, filename: P) -> Result<()> {
    render!(filename, (3 * SIZE.0, SIZE.1), draw_peak_counts, counts)
}

fn ecdf(values: Vec<f64>) -> Vec<(f64, f64)> {
    let mut values: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len() as f64;
    values
        .into_iter()
        .enumerate()
        .map(|(i, x)| (x, (i + 1) as f64 / n))
        .collect()
}

fn draw_ecdf_pair<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    x_desc: &str,
    peak: Vec<(f64, f64)>,
    base: Vec<(f64, f64)>,
    rgb: RGBColor,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some((lo, hi)) = minmax(peak.iter().chain(base.iter()).map(|(x, _)| x)) else {
        return Ok(());
    };
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(lo..hi, 0f64..1f64)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("ECDF")
        .draw()?;
    chart
        .draw_series(LineSeries::new(peak, rgb.stroke_width(2)))?
        .label("peak days")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], rgb.stroke_width(2)));
    let faded = rgb.mix(0.4);
    chart
        .draw_series(LineSeries::new(base, faded.stroke_width(1)))?
        .label("baseline days")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &faded));
    legend(&mut chart)
}

fn draw_cumdistr<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    peaks: &DailyStatistics,
    baseline: &DailyStatistics,
    statistic: Statistic,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let columns = peaks.columns();
    if columns.is_empty() {
        return Ok(());
    }
    let panels = root.split_evenly((1, columns.len()));
    for (k, (name, panel)) in columns.iter().zip(panels.iter()).enumerate() {
        let base = baseline
            .columns()
            .iter()
            .position(|c| c == name)
            .map(|j| ecdf(baseline.statistic(statistic, j)))
            .unwrap_or_default();
        draw_ecdf_pair(
            panel,
            name,
            &format!("daily {}", statistic),
            ecdf(peaks.statistic(statistic, k)),
            base,
            tableau(k),
        )?;
    }
    Ok(())
}
/// Compares the cumulative distributions of a daily statistic of peak and baseline days,
/// one panel per column
pub fn cumdistr_comparison<P: AsRef<Path>>(
    peaks: &DailyStatistics,
    baseline: &DailyStatistics,
    statistic: Statistic,
    filename: P,
) -> Result<()> {
    let size = (SIZE.0 * peaks.columns().len().max(1) as u32 / 2, SIZE.1);
    render!(filename, size, draw_cumdistr, peaks, baseline, statistic)
}

fn draw_centers<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    centers: &[Vec<f64>],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let Some((lo, hi)) = minmax(centers.iter().flatten()) else {
        return Ok(());
    };
    let m = centers.iter().map(|c| c.len()).max().unwrap_or(1);
    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..(m.max(2) - 1) as f64, lo..hi)?;
    chart
        .configure_mesh()
        .x_desc("Hour")
        .y_desc("Scaled concentration")
        .draw()?;
    for (k, center) in centers.iter().enumerate() {
        let rgb = tableau(k);
        chart
            .draw_series(LineSeries::new(
                center.iter().enumerate().map(|(i, &y)| (i as f64, y)),
                &rgb,
            ))?
            .label(format!("cluster #{}", k))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
    }
    legend(&mut chart)
}
/// Plots the daily profiles of the cluster centers
pub fn cluster_centers_plot<P: AsRef<Path>>(centers: &[Vec<f64>], filename: P) -> Result<()> {
    render!(filename, SIZE, draw_centers, centers)
}

fn draw_sizes<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, sizes: &[usize]) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let names: Vec<String> = (0..sizes.len()).map(|k| format!("#{}", k)).collect();
    draw_bars(&root, "Days per cluster", &names, sizes)
}
/// Plots the number of days in each cluster
pub fn cluster_distribution_plot<P: AsRef<Path>>(sizes: &[usize], filename: P) -> Result<()> {
    render!(filename, SIZE, draw_sizes, sizes)
}

fn draw_weekly<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    distribution: &[[usize; 7]],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let y_max = distribution.iter().flatten().cloned().max().unwrap_or(0) as f64;
    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(-0.5f64..6.5f64, 0f64..y_max + 1.)?;
    chart
        .configure_mesh()
        .x_labels(7)
        .x_label_formatter(&|x: &f64| {
            WEEKDAYS
                .get(x.round() as usize)
                .map(|d| d.to_string())
                .unwrap_or_default()
        })
        .y_desc("Days")
        .draw()?;
    for (k, days) in distribution.iter().enumerate() {
        let rgb = tableau(k);
        let points: Vec<(f64, f64)> = days
            .iter()
            .enumerate()
            .map(|(i, &n)| (i as f64, n as f64))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), &rgb))?
            .label(format!("cluster #{}", k))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, rgb.filled())))?;
    }
    legend(&mut chart)
}
/// Plots the number of days of each cluster per weekday
pub fn weekly_cluster_distribution_plot<P: AsRef<Path>>(
    distribution: &[[usize; 7]],
    filename: P,
) -> Result<()> {
    render!(filename, SIZE, draw_weekly, distribution)
}

fn draw_hourly_cumdistr<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    peaks: &[Vec<f64>],
    baseline: &[Vec<f64>],
    column: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let panels = root.split_evenly((6, 4));
    for (hour, panel) in panels.iter().enumerate() {
        let values = |hours: &[Vec<f64>]| hours.get(hour).cloned().unwrap_or_default();
        draw_ecdf_pair(
            panel,
            &format!("{:02}:00", hour),
            column,
            ecdf(values(peaks)),
            ecdf(values(baseline)),
            tableau(0),
        )?;
    }
    Ok(())
}
/// Compares the cumulative distributions of the hourly values of peak and baseline days,
/// one panel per hour of the day
///
/// `peaks` and `baseline` are the values per hour as given by [hourly_values](crate::hourly_values).
pub fn hourly_cumdistr_comparison<P: AsRef<Path>>(
    peaks: &[Vec<f64>],
    baseline: &[Vec<f64>],
    column: &str,
    filename: P,
) -> Result<()> {
    render!(
        filename,
        (2 * SIZE.0, 3 * SIZE.1),
        draw_hourly_cumdistr,
        peaks,
        baseline,
        column
    )
}

fn draw_correlation<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    correlation: &Correlation,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let names = correlation.columns();
    let n = names.len() as u32;
    if n == 0 {
        return Ok(());
    }
    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 160)
        .set_label_area_size(LabelAreaPosition::Bottom, 120)
        .margin(10)
        .build_cartesian_2d((0u32..n).into_segmented(), (0u32..n).into_segmented())?;
    let label = |v: &SegmentValue<u32>, row: bool| match v {
        SegmentValue::CenterOf(i) if *i < n => {
            let i = if row { n - 1 - i } else { *i };
            names[i as usize].clone()
        }
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&|v| label(v, false))
        .y_label_formatter(&|v| label(v, true))
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .draw()?;
    let centered = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    for i in 0..n {
        for j in 0..n {
            let r = correlation.get(i as usize, j as usize);
            // rows from top to bottom
            let y = n - 1 - i;
            let color = if r.is_finite() {
                let c = colorous::VIRIDIS.eval_continuous((r + 1.) / 2.);
                RGBColor(c.r, c.g, c.b)
            } else {
                RGBColor(200, 200, 200)
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
                ],
                color.filled(),
            )))?;
            let ink = if r > 0.5 { &BLACK } else { &WHITE };
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", r),
                (SegmentValue::CenterOf(j), SegmentValue::CenterOf(y)),
                centered.color(ink),
            )))?;
        }
    }
    Ok(())
}
/// Plots the correlation matrix as a heat map, from -1 (dark) to 1 (light)
pub fn correlation_plot<P: AsRef<Path>>(correlation: &Correlation, filename: P) -> Result<()> {
    let side = SIZE.1.max(64 * correlation.columns().len() as u32 + 280);
    render!(filename, (side, side), draw_correlation, correlation)
}

fn draw_lag<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    table: &ObservationTable,
    lag: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let n_rows = table.n_columns().div_ceil(3).max(1);
    let panels = root.split_evenly((n_rows, 3));
    for (k, ((name, values), panel)) in table.iter_columns().zip(panels.iter()).enumerate() {
        let pairs = lag_pairs(values, lag);
        let Some((lo, hi)) = minmax(pairs.iter().flat_map(|(a, b)| [a, b])) else {
            continue;
        };
        let mut chart = ChartBuilder::on(panel)
            .caption(name, ("sans-serif", 20))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(lo..hi, lo..hi)?;
        chart
            .configure_mesh()
            .x_desc("y(t)")
            .y_desc(format!("y(t + {})", lag))
            .draw()?;
        let rgb = tableau(k).mix(0.5);
        chart.draw_series(
            pairs
                .into_iter()
                .map(|p| Circle::new(p, 2, rgb.filled())),
        )?;
    }
    Ok(())
}
/// Scatter plots of the records of each column against the records `lag` rows later
pub fn lag_plot<P: AsRef<Path>>(table: &ObservationTable, lag: usize, filename: P) -> Result<()> {
    let n_rows = table.n_columns().div_ceil(3).max(1) as u32;
    render!(
        filename,
        (3 * SIZE.0 / 2, n_rows * SIZE.1 * 3 / 4),
        draw_lag,
        table,
        lag
    )
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn draw_profiles<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    x_desc: &str,
    group: &TrendGroup,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some((lo, hi)) = minmax(group.members.iter().flat_map(|(_, p)| p.iter())) else {
        return Ok(());
    };
    let len = group.mean.len().max(2);
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..(len - 1) as f64, lo..hi)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Concentration")
        .draw()?;
    let faded = tableau(0).mix(0.1);
    for (_, profile) in &group.members {
        let lines = runs(
            profile
                .iter()
                .enumerate()
                .map(|(i, &y)| (i as f64, Some(y))),
        );
        for line in lines {
            chart.draw_series(LineSeries::new(line, &faded))?;
        }
    }
    let mean = runs(
        group
            .mean
            .iter()
            .enumerate()
            .map(|(i, &y)| (i as f64, Some(y))),
    );
    for (i, line) in mean.into_iter().enumerate() {
        let series = chart.draw_series(LineSeries::new(line, BLUE.stroke_width(2)))?;
        if i == 0 {
            series
                .label("mean")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
        }
    }
    legend(&mut chart)
}

fn draw_trend<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    groups: &[TrendGroup],
    trend: Trend,
    column: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    match trend {
        Trend::Month => {
            let panels = root.split_evenly((4, 3));
            for group in groups {
                let Some(i) = (group.group as usize).checked_sub(1) else {
                    continue;
                };
                let (Some(panel), Some(caption)) = (panels.get(i), MONTHS.get(i)) else {
                    continue;
                };
                draw_profiles(panel, caption, "Hour of the day", group)?;
            }
        }
        Trend::Week => {
            for group in groups {
                let caption = format!("{} per weekday", column);
                draw_profiles(&root, &caption, "Hours since Monday 00:00", group)?;
            }
        }
        Trend::Year => {
            for group in groups {
                let caption = format!("{} daily means per year", column);
                draw_profiles(&root, &caption, "Day of the year", group)?;
            }
        }
    }
    Ok(())
}
/// Plots the member profiles and the mean profile of each calendar group
pub fn trend_plot<P: AsRef<Path>>(
    groups: &[TrendGroup],
    trend: Trend,
    column: &str,
    filename: P,
) -> Result<()> {
    let size = match trend {
        Trend::Month => (3 * SIZE.0 / 2, 2 * SIZE.1),
        Trend::Week | Trend::Year => (2 * SIZE.0, SIZE.1),
    };
    render!(filename, size, draw_trend, groups, trend, column)
}

fn draw_series_by_cluster<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    labels: &[usize],
    series: &[Vec<f64>],
    centers: &[Vec<f64>],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    if centers.is_empty() {
        return Ok(());
    }
    let Some((lo, hi)) = minmax(series.iter().chain(centers).flatten()) else {
        return Ok(());
    };
    let m = centers.iter().map(|c| c.len()).max().unwrap_or(1).max(2);
    let panels = root.split_evenly((centers.len(), 1));
    let gray = RGBColor(128, 128, 128).mix(0.4);
    for (k, (center, panel)) in centers.iter().zip(panels.iter()).enumerate() {
        let n = center.len().max(1) as f64;
        let mean = center.iter().sum::<f64>() / n;
        let sd = (center.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt();
        let mut chart = ChartBuilder::on(panel)
            .caption(
                format!("cluster #{}: mean {:.2}, sd {:.2}", k, mean, sd),
                ("sans-serif", 20),
            )
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(0f64..(m - 1) as f64, lo..hi)?;
        chart
            .configure_mesh()
            .x_desc("Hour")
            .y_desc("Scaled concentration")
            .draw()?;
        for (_, member) in labels.iter().zip(series).filter(|(l, _)| **l == k) {
            chart.draw_series(LineSeries::new(
                member.iter().enumerate().map(|(i, &y)| (i as f64, y)),
                &gray,
            ))?;
        }
        chart.draw_series(LineSeries::new(
            center.iter().enumerate().map(|(i, &y)| (i as f64, y)),
            RED.stroke_width(3),
        ))?;
    }
    Ok(())
}
/// Overlays the daily series of each cluster with the cluster center, one panel per cluster
pub fn series_by_cluster_plot<P: AsRef<Path>>(
    labels: &[usize],
    series: &[Vec<f64>],
    centers: &[Vec<f64>],
    filename: P,
) -> Result<()> {
    let size = (SIZE.0, (SIZE.1 / 2) * centers.len().max(1) as u32);
    render!(
        filename,
        size,
        draw_series_by_cluster,
        labels,
        series,
        centers
    )
}
