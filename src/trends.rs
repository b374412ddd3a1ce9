use chrono::NaiveDate;
use log::debug;
use ndarray::ArrayView1;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{chronological, TestRecord, UserSettings};

/// Marks-per-test slope below which a series is reported as stable.
const STABLE_SLOPE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares of `y` against `x`.
/// Returns `None` for fewer than two points or when every `x` is equal.
pub fn fit(x: &[f64], y: &[f64]) -> Option<Regression> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }

    let x = ArrayView1::from(x);
    let y = ArrayView1::from(y);
    let n = x.len() as f64;
    let sum_x = x.sum();
    let sum_y = y.sum();
    let sum_xy = x.dot(&y);
    let sum_xx = x.dot(&x);

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() <= f64::EPSILON * n * sum_xx.abs().max(1.0) {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(Regression { slope, intercept })
}

/// OLS of a series against its index `0..n`.
pub fn linear_regression(y: &[f64]) -> Option<Regression> {
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    fit(&x, y)
}

/// `(cohort - rank) / cohort * 100`, floored at zero.
pub fn rank_to_percentile(rank: f64, cohort_size: f64) -> f64 {
    if cohort_size <= 0.0 {
        return 0.0;
    }
    ((cohort_size - rank) / cohort_size * 100.0).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub test_id: String,
    pub test_name: String,
    pub date: NaiveDate,
    pub marks: f64,
    pub fitted_marks: f64,
    pub rank: Option<u32>,
    pub percentile: Option<f64>,
    pub trend_percentile: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub score_trend: Regression,
    pub projected_next_marks: f64,
    pub rank_trend: Option<Regression>,
    pub projected_next_rank: Option<f64>,
    pub cohort_size: f64,
    pub points: Vec<TrendPoint>,
}

pub struct TrendAnalyzer<'a> {
    config: &'a EngineConfig,
}

impl<'a> TrendAnalyzer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        TrendAnalyzer { config }
    }

    /// Cohort from the user's profile, else `max(min_cohort, max_rank * headroom)`.
    pub fn cohort_size(&self, tests: &[&TestRecord], settings: &UserSettings) -> f64 {
        if let Some(size) = settings.cohort_size.filter(|&s| s > 0) {
            return size as f64;
        }
        let max_rank = tests.iter().filter_map(|t| t.rank).max().unwrap_or(0);
        self.config
            .min_cohort_size
            .max(max_rank as f64 * self.config.cohort_headroom)
    }

    pub fn analyze(&self, tests: &[TestRecord], settings: &UserSettings) -> Option<TrendReport> {
        if tests.len() < self.config.min_trend_records.max(2) {
            return None;
        }

        let ordered = chronological(tests);
        let marks: Vec<f64> = ordered.iter().map(|t| t.total_marks).collect();
        let score_trend = linear_regression(&marks)?;
        let projected_next_marks = score_trend.predict(marks.len() as f64).max(0.0);

        let cohort_size = self.cohort_size(&ordered, settings);
        let ranks: Vec<f64> = ordered.iter().filter_map(|t| t.rank).map(f64::from).collect();
        let rank_trend = linear_regression(&ranks);
        let projected_next_rank = rank_trend.map(|r| r.predict(ranks.len() as f64).max(1.0));

        let percentiles: Vec<f64> = ranks.iter().map(|&r| rank_to_percentile(r, cohort_size)).collect();

        let mut ranked_index = 0;
        let points = ordered
            .iter()
            .enumerate()
            .map(|(i, test)| {
                let (percentile, trend_percentile) = match test.rank {
                    Some(_) => {
                        let p = percentiles[ranked_index];
                        // the fitted rank line, read as a percentile
                        let trend = rank_trend
                            .map(|r| rank_to_percentile(r.predict(ranked_index as f64).max(1.0), cohort_size));
                        ranked_index += 1;
                        (Some(p), trend)
                    }
                    None => (None, None),
                };
                TrendPoint {
                    test_id: test.id.clone(),
                    test_name: test.name.clone(),
                    date: test.date,
                    marks: test.total_marks,
                    fitted_marks: score_trend.predict(i as f64),
                    rank: test.rank,
                    percentile,
                    trend_percentile,
                }
            })
            .collect();

        let direction = if score_trend.slope > STABLE_SLOPE {
            TrendDirection::Improving
        } else if score_trend.slope < -STABLE_SLOPE {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        debug!(
            "trend over {} tests: slope {:.2}, cohort {:.0}",
            ordered.len(),
            score_trend.slope,
            cohort_size
        );

        Some(TrendReport {
            direction,
            score_trend,
            projected_next_marks,
            rank_trend,
            projected_next_rank,
            cohort_size,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, day: u32, marks: f64, rank: Option<u32>) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            name: format!("Mock {}", id),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            total_marks: marks,
            max_marks: Some(300.0),
            rank,
            subjects: Vec::new(),
        }
    }

    #[test]
    fn test_linear_regression_exact_line() {
        let r = linear_regression(&[3.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((r.slope - 2.0).abs() < 1e-9);
        assert!((r.intercept - 3.0).abs() < 1e-9);
        assert!((r.predict(4.0) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_regression_needs_two_points() {
        assert!(linear_regression(&[]).is_none());
        assert!(linear_regression(&[42.0]).is_none());
        assert!(fit(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_percentile_clamped() {
        assert!((rank_to_percentile(1000.0, 10_000.0) - 90.0).abs() < 1e-9);
        assert_eq!(rank_to_percentile(20_000.0, 10_000.0), 0.0);
        assert_eq!(rank_to_percentile(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_analyze_orders_by_date_and_projects() {
        let config = EngineConfig::default();
        let tests = vec![
            record("c", 20, 160.0, Some(3000)),
            record("a", 1, 120.0, Some(5000)),
            record("b", 10, 140.0, Some(4000)),
        ];

        let report = TrendAnalyzer::new(&config).analyze(&tests, &UserSettings::default()).unwrap();
        let ids: Vec<&str> = report.points.iter().map(|p| p.test_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((report.projected_next_marks - 180.0).abs() < 1e-9);
        assert!((report.projected_next_rank.unwrap() - 2000.0).abs() < 1e-6);
        assert_eq!(report.direction, TrendDirection::Improving);
        assert_eq!(report.cohort_size, 10_000.0);
        assert!((report.points[0].percentile.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_cohort_and_settings_override() {
        let config = EngineConfig::default();
        let tests = vec![record("a", 1, 90.0, Some(50_000)), record("b", 2, 95.0, Some(40_000))];
        let analyzer = TrendAnalyzer::new(&config);

        let report = analyzer.analyze(&tests, &UserSettings::default()).unwrap();
        assert!((report.cohort_size - 60_000.0).abs() < 1e-9);

        let settings = UserSettings {
            cohort_size: Some(1_000_000),
            ..UserSettings::default()
        };
        let report = analyzer.analyze(&tests, &settings).unwrap();
        assert_eq!(report.cohort_size, 1_000_000.0);
    }

    #[test]
    fn test_unranked_tests_have_no_percentile() {
        let config = EngineConfig::default();
        let tests = vec![record("a", 1, 100.0, None), record("b", 2, 100.0, Some(900))];
        let report = TrendAnalyzer::new(&config).analyze(&tests, &UserSettings::default()).unwrap();
        assert!(report.points[0].percentile.is_none());
        assert!(report.points[1].percentile.is_some());
        assert!(report.rank_trend.is_none());
        assert_eq!(report.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_trend_percentile_follows_rank_line_past_cohort() {
        let config = EngineConfig::default();
        let tests = vec![
            record("a", 1, 100.0, Some(1500)),
            record("b", 2, 120.0, Some(900)),
            record("c", 3, 140.0, Some(300)),
        ];
        let settings = UserSettings {
            cohort_size: Some(1000),
            ..UserSettings::default()
        };

        let report = TrendAnalyzer::new(&config).analyze(&tests, &settings).unwrap();
        let trend: Vec<f64> = report.points.iter().map(|p| p.trend_percentile.unwrap()).collect();
        assert_eq!(trend[0], 0.0);
        assert!((trend[1] - 10.0).abs() < 1e-6);
        assert!((trend[2] - 70.0).abs() < 1e-6);
        assert_eq!(report.points[0].percentile, Some(0.0));
    }

    #[test]
    fn test_single_test_is_no_data() {
        let config = EngineConfig::default();
        let tests = vec![record("a", 1, 100.0, Some(10))];
        assert!(TrendAnalyzer::new(&config).analyze(&tests, &UserSettings::default()).is_none());
    }
}
