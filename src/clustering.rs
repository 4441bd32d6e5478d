//! Daily profiles clustering
//!
//! The daily series are rescaled with [MeanVarianceScaler] and grouped with
//! a Euclidean [KMeans] seeded with k-means++.
//! [bench_k_means] compares the fits for several numbers of clusters.

use chrono::{Datelike, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::{fmt, time::Instant};

#[derive(thiserror::Error, Debug)]
pub enum ClusteringError {
    #[error("no sample to cluster")]
    Empty,
    #[error("sample #{sample} has {found} values, expected {expected}")]
    UnequalLength {
        sample: usize,
        expected: usize,
        found: usize,
    },
    #[error("{n_samples} samples for {n_clusters} clusters")]
    TooFewSamples { n_samples: usize, n_clusters: usize },
    #[error("the number of clusters must be at least 1")]
    ZeroClusters,
    #[error("{labels} labels for {samples} samples")]
    LabelMismatch { labels: usize, samples: usize },
}
type Result<T> = std::result::Result<T, ClusteringError>;

fn check(data: &[Vec<f64>]) -> Result<usize> {
    let m = data.first().map(|x| x.len()).ok_or(ClusteringError::Empty)?;
    match data.iter().enumerate().find(|(_, x)| x.len() != m) {
        Some((sample, x)) => Err(ClusteringError::UnequalLength {
            sample,
            expected: m,
            found: x.len(),
        }),
        None => Ok(m),
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// Rescales each series to zero mean and unit variance
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanVarianceScaler;
impl MeanVarianceScaler {
    /// Returns the rescaled series
    ///
    /// The variance is the population variance, constant series are set to 0.
    pub fn transform(&self, series: &[Vec<f64>]) -> Vec<Vec<f64>> {
        series
            .iter()
            .map(|x| {
                if x.is_empty() {
                    return vec![];
                }
                let n = x.len() as f64;
                let mean = x.iter().sum::<f64>() / n;
                let std = (x.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt();
                if std > f64::EPSILON {
                    x.iter().map(|x| (x - mean) / std).collect()
                } else {
                    vec![0.; x.len()]
                }
            })
            .collect()
    }
}

/// K-means model
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    n_init: usize,
    seed: u64,
}
impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_clusters: 2,
            max_iter: 300,
            tol: 1e-6,
            n_init: 10,
            seed: 0,
        }
    }
}

/// A fitted [KMeans] model
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// cluster of each sample
    pub labels: Vec<usize>,
    pub centers: Vec<Vec<f64>>,
    /// sum of the squared distances of the samples to their cluster center
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }
    pub fn n_clusters(self, n_clusters: usize) -> Self {
        Self { n_clusters, ..self }
    }
    pub fn max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }
    /// Convergence threshold on the largest center displacement
    pub fn tol(self, tol: f64) -> Self {
        Self { tol, ..self }
    }
    /// Number of seedings, the fit with the lowest inertia is kept
    pub fn n_init(self, n_init: usize) -> Self {
        Self {
            n_init: n_init.max(1),
            ..self
        }
    }
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
    pub fn get_n_clusters(&self) -> usize {
        self.n_clusters
    }

    fn plusplus_init(&self, data: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = data.len();
        let mut centers: Vec<Vec<f64>> = Vec::with_capacity(self.n_clusters);
        centers.push(data[rng.gen_range(0..n)].clone());
        for _ in 1..self.n_clusters {
            let d2: Vec<f64> = data
                .iter()
                .map(|x| {
                    centers
                        .iter()
                        .map(|c| squared_distance(x, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let total: f64 = d2.iter().sum();
            let chosen = if total > f64::EPSILON {
                let r = rng.gen::<f64>() * total;
                let mut cumsum = 0.;
                d2.iter()
                    .position(|d| {
                        cumsum += d;
                        cumsum >= r
                    })
                    .unwrap_or(n - 1)
            } else {
                rng.gen_range(0..n)
            };
            centers.push(data[chosen].clone());
        }
        centers
    }

    fn assign(data: &[Vec<f64>], centers: &[Vec<f64>]) -> (Vec<usize>, f64) {
        let (labels, d2): (Vec<usize>, Vec<f64>) = data
            .par_iter()
            .map(|x| {
                centers
                    .iter()
                    .map(|c| squared_distance(x, c))
                    .enumerate()
                    .fold((0, f64::INFINITY), |best, (k, d)| {
                        if d < best.1 {
                            (k, d)
                        } else {
                            best
                        }
                    })
            })
            .unzip();
        (labels, d2.iter().sum())
    }

    fn update(data: &[Vec<f64>], labels: &[usize], centers: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let m = centers.first().map_or(0, |c| c.len());
        let mut sums = vec![vec![0f64; m]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (x, &k) in data.iter().zip(labels) {
            counts[k] += 1;
            sums[k].iter_mut().zip(x).for_each(|(s, x)| *s += x);
        }
        sums.into_iter()
            .zip(counts)
            .zip(centers)
            .map(|((sum, count), center)| {
                if count == 0 {
                    center.clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect()
    }

    fn run(&self, data: &[Vec<f64>], rng: &mut StdRng) -> KMeansFit {
        let mut centers = self.plusplus_init(data, rng);
        let (mut labels, mut inertia) = Self::assign(data, &centers);
        let mut n_iter = 0;
        while n_iter < self.max_iter {
            n_iter += 1;
            let new_centers = Self::update(data, &labels, &centers);
            let shift = centers
                .iter()
                .zip(&new_centers)
                .map(|(a, b)| squared_distance(a, b))
                .fold(0f64, f64::max);
            centers = new_centers;
            (labels, inertia) = Self::assign(data, &centers);
            if shift <= self.tol * self.tol {
                break;
            }
        }
        KMeansFit {
            labels,
            centers,
            inertia,
            n_iter,
        }
    }

    /// Clusters the samples
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansFit> {
        if self.n_clusters == 0 {
            return Err(ClusteringError::ZeroClusters);
        }
        check(data)?;
        if data.len() < self.n_clusters {
            return Err(ClusteringError::TooFewSamples {
                n_samples: data.len(),
                n_clusters: self.n_clusters,
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init {
            let fit = self.run(data, &mut rng);
            if best.as_ref().map_or(true, |best| fit.inertia < best.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(ClusteringError::Empty)
    }
}

/// Mean silhouette coefficient of a clustering
///
/// Samples alone in their cluster have a coefficient of 0,
/// the score is 0 if less than 2 clusters are populated.
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    check(data)?;
    if labels.len() != data.len() {
        return Err(ClusteringError::LabelMismatch {
            labels: labels.len(),
            samples: data.len(),
        });
    }
    let sizes = cluster_sizes(labels);
    if sizes.iter().filter(|&&n| n > 0).count() < 2 {
        return Ok(0.);
    }
    let s: Vec<f64> = data
        .par_iter()
        .zip(labels)
        .map(|(x, &k)| {
            if sizes[k] < 2 {
                return 0.;
            }
            let mut sums = vec![0f64; sizes.len()];
            data.iter()
                .zip(labels)
                .for_each(|(y, &l)| sums[l] += squared_distance(x, y).sqrt());
            let a = sums[k] / (sizes[k] - 1) as f64;
            let b = sums
                .iter()
                .zip(&sizes)
                .enumerate()
                .filter(|&(l, (_, &n))| l != k && n > 0)
                .map(|(_, (s, &n))| s / n as f64)
                .fold(f64::INFINITY, f64::min);
            (b - a) / a.max(b)
        })
        .collect();
    Ok(s.iter().sum::<f64>() / s.len() as f64)
}

/// Number of samples per cluster
pub fn cluster_sizes(labels: &[usize]) -> Vec<usize> {
    let n = labels.iter().max().map_or(0, |k| k + 1);
    let mut sizes = vec![0; n];
    labels.iter().for_each(|&k| sizes[k] += 1);
    sizes
}

/// Number of samples per cluster and per weekday, from Monday to Sunday
pub fn weekday_distribution(labels: &[usize], dates: &[NaiveDate]) -> Result<Vec<[usize; 7]>> {
    if labels.len() != dates.len() {
        return Err(ClusteringError::LabelMismatch {
            labels: labels.len(),
            samples: dates.len(),
        });
    }
    let n = labels.iter().max().map_or(0, |k| k + 1);
    let mut distribution = vec![[0; 7]; n];
    labels
        .iter()
        .zip(dates)
        .for_each(|(&k, d)| distribution[k][d.weekday().num_days_from_monday() as usize] += 1);
    Ok(distribution)
}

/// Benchmark of a [KMeans] fit
#[derive(Debug, Clone)]
pub struct BenchResult {
    pub name: String,
    pub n_clusters: usize,
    /// fit time in seconds
    pub fit_time: f64,
    pub inertia: f64,
    pub silhouette: f64,
    pub fit: KMeansFit,
}
impl BenchResult {
    /// Scales the data, fits the model and scores the fit
    pub fn new(name: &str, model: &KMeans, data: &[Vec<f64>]) -> Result<Self> {
        let now = Instant::now();
        let scaled = MeanVarianceScaler.transform(data);
        let fit = model.fit(&scaled)?;
        let fit_time = now.elapsed().as_secs_f64();
        let silhouette = silhouette_score(&scaled, &fit.labels)?;
        Ok(Self {
            name: name.to_string(),
            n_clusters: model.get_n_clusters(),
            fit_time,
            inertia: fit.inertia,
            silhouette,
            fit,
        })
    }
    /// Header line matching the [Display](fmt::Display) format
    pub fn header() -> String {
        format!(
            "{:9}\t\t{}\t{:>5}\t{:>9}\t\t{}",
            "init", "k", "time", "inertia", "silhouette"
        )
    }
}
impl fmt::Display for BenchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:9}\t\t{}\t{:.3}\t{:.3}\t\t{:.3}",
            self.name, self.n_clusters, self.fit_time, self.inertia, self.silhouette
        )
    }
}

/// Benchmarks [KMeans] for each number of clusters in `ks`, in the order of `ks`
pub fn bench_k_means(name: &str, data: &[Vec<f64>], ks: &[usize]) -> Result<Vec<BenchResult>> {
    ks.par_iter()
        .map(|&k| BenchResult::new(name, &KMeans::new(k), data))
        .collect()
}
