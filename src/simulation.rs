//! Monte Carlo rank forecast.
//!
//! Historical (marks, rank) pairs are fitted with a log-linear model,
//! `ln(rank) = slope * marks + intercept`. Marks are then sampled from a
//! normal distribution with the historical mean and population standard
//! deviation, pushed through the model, and the resulting rank samples are
//! summarised as percentiles, a goal probability and a histogram.
//!
//! The random source is always supplied by the caller, so a seeded
//! `rand::rngs::StdRng` replays a forecast exactly.

use std::f64::consts::PI;
use std::sync::OnceLock;

use log::{debug, warn};
use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{LongTermGoal, TestRecord};
use crate::trends::{fit, Regression};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionBucket {
    pub rank_midpoint: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankForecast {
    pub best_case: f64,
    pub likely: f64,
    pub worst_case: f64,
    /// Sorted by rank, worst (largest) first.
    pub distribution: Vec<DistributionBucket>,
    pub mean_marks: f64,
    pub stddev_marks: f64,
    pub model: Regression,
    pub runs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProbability {
    pub target_rank: u32,
    pub probability_percent: f64,
    /// False when no goal text carried a number and the default target was used.
    pub parsed_from_goal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub forecast: RankForecast,
    pub goal: GoalProbability,
}

static GOAL_DIGITS: OnceLock<Option<Regex>> = OnceLock::new();

/// First integer in the first incomplete goal, if any.
pub fn parse_target_rank(goals: &[LongTermGoal]) -> Option<u32> {
    let goal = goals.iter().find(|g| !g.completed)?;
    let digits = GOAL_DIGITS.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()?;
    let found = digits.find(&goal.text)?;
    found.as_str().parse().ok()
}

/// Box-Muller draw from N(0, 1). `u1` is redrawn while it is exactly zero.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u1: f64 = rng.gen();
    while u1 == 0.0 {
        u1 = rng.gen();
    }
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Value at percentile `p` of an ascending slice, by floor index.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let index = ((p / 100.0) * sorted.len() as f64).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub struct RankSimulator<'a> {
    config: &'a EngineConfig,
}

impl<'a> RankSimulator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        RankSimulator { config }
    }

    /// Returns `None` when fewer than `min_simulation_records` tests carry a rank.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        tests: &[TestRecord],
        goals: &[LongTermGoal],
        rng: &mut R,
    ) -> Option<SimulationResult> {
        let ranked: Vec<(f64, f64)> = tests
            .iter()
            .filter_map(|t| t.rank.map(|rank| (t.total_marks, f64::from(rank.max(1)).ln())))
            .collect();
        if ranked.len() < self.config.min_simulation_records.max(1) {
            debug!("rank simulation skipped: {} ranked tests", ranked.len());
            return None;
        }

        let marks: Vec<f64> = ranked.iter().map(|&(m, _)| m).collect();
        let log_ranks: Vec<f64> = ranked.iter().map(|&(_, r)| r).collect();
        let (mean_marks, stddev_marks) = mean_and_stddev(&marks);

        // Identical marks in every test leave no slope to fit; predict the mean log-rank.
        let model = fit(&marks, &log_ranks).unwrap_or_else(|| Regression {
            slope: 0.0,
            intercept: mean_and_stddev(&log_ranks).0,
        });

        let runs = self.config.simulation_runs.max(1);
        let mut samples: Vec<f64> = (0..runs)
            .map(|_| {
                let simulated_marks = mean_marks + standard_normal(&mut *rng) * stddev_marks;
                model.predict(simulated_marks).exp()
            })
            .collect();
        samples.sort_by(f64::total_cmp);

        let forecast = RankForecast {
            best_case: percentile(&samples, 5.0),
            likely: percentile(&samples, 50.0),
            worst_case: percentile(&samples, 95.0),
            distribution: histogram(&samples, self.config.histogram_buckets),
            mean_marks,
            stddev_marks,
            model,
            runs,
        };

        let parsed = parse_target_rank(goals);
        if parsed.is_none() && goals.iter().any(|g| !g.completed) {
            warn!("no target rank in goal text, using default {}", self.config.default_target_rank);
        }
        let target_rank = parsed.unwrap_or(self.config.default_target_rank);
        let hits = samples.iter().filter(|&&rank| rank <= target_rank as f64).count();
        let goal = GoalProbability {
            target_rank,
            probability_percent: hits as f64 / runs as f64 * 100.0,
            parsed_from_goal: parsed.is_some(),
        };

        debug!(
            "rank forecast: best {:.0}, likely {:.0}, worst {:.0}, P(rank <= {}) = {:.1}%",
            forecast.best_case, forecast.likely, forecast.worst_case, target_rank, goal.probability_percent
        );

        Some(SimulationResult { forecast, goal })
    }
}

/// Buckets the 1st..99th percentile range into equal-width bins. Each bin's
/// probability is its share of all samples, so the total is at most 1.
fn histogram(sorted: &[f64], buckets: usize) -> Vec<DistributionBucket> {
    let buckets = buckets.max(1);
    let runs = sorted.len() as f64;
    let low = percentile(sorted, 1.0);
    let high = percentile(sorted, 99.0);
    let in_range = sorted.iter().filter(|&&r| r >= low && r <= high);

    let width = (high - low) / buckets as f64;
    if !(width > 0.0 && width.is_finite()) {
        return vec![DistributionBucket {
            rank_midpoint: low,
            probability: in_range.count() as f64 / runs,
        }];
    }

    let mut counts = vec![0usize; buckets];
    for &rank in in_range {
        let index = (((rank - low) / width).floor() as usize).min(buckets - 1);
        counts[index] += 1;
    }

    counts
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &count)| DistributionBucket {
            rank_midpoint: low + (i as f64 + 0.5) * width,
            probability: count as f64 / runs,
        })
        .collect()
}
