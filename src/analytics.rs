use std::collections::HashSet;

use chrono::NaiveDate;
use log::{info, warn};
use rand::Rng;
use serde::Serialize;

use crate::aggregator::{
    self, FatigueBucket, ParetoPoint, ReasonStat, SubjectErrorStat, TimeBucketStat, WeakTopicStat,
};
use crate::config::EngineConfig;
use crate::data::Dataset;
use crate::dependency::{dependency_alerts, DependencyAlert};
use crate::guess::{profile_guesses, GuessStats};
use crate::model::{chronological, QuestionAttempt, SubjectMetrics, TestRecord};
use crate::roi::{roi_points, RoiPoint};
use crate::sequence::{detect_panic_events, PanicEvent};
use crate::simulation::{RankSimulator, SimulationResult};
use crate::tables::{MarkingTable, TopicDependencyGraph, TopicWeightageMap};
use crate::trends::{TrendAnalyzer, TrendReport};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SubjectSummary {
    pub subject: String,
    pub marks: f64,
    pub rank: Option<u32>,
    pub metrics: SubjectMetrics,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TestSummary {
    pub test_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub total_marks: f64,
    pub rank: Option<u32>,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ErrorAnalysis {
    pub total_errors: usize,
    pub weak_topics: Vec<WeakTopicStat>,
    pub pareto: Vec<ParetoPoint>,
    pub fatigue_curve: Vec<FatigueBucket>,
    pub reasons: Vec<ReasonStat>,
    pub subjects: Vec<SubjectErrorStat>,
    pub time_buckets: Vec<TimeBucketStat>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AnalyticsReport {
    pub total_tests: usize,
    pub total_attempts: usize,
    pub orphaned_attempts: usize,
    pub tests: Vec<TestSummary>,
    pub errors: ErrorAnalysis,
    pub panic_events: Vec<PanicEvent>,
    pub dependency_alerts: Vec<DependencyAlert>,
    pub guesses: GuessStats,
    pub trend: Option<TrendReport>,
    pub forecast: Option<SimulationResult>,
    pub roi: Vec<RoiPoint>,
}

/// Splits attempts into those that belong to a known test and orphans.
pub fn partition_orphans<'a>(
    tests: &[TestRecord],
    attempts: &'a [QuestionAttempt],
) -> (Vec<QuestionAttempt>, Vec<&'a QuestionAttempt>) {
    let known: HashSet<&str> = tests.iter().map(|t| t.id.as_str()).collect();
    let (owned, orphans): (Vec<&QuestionAttempt>, Vec<&QuestionAttempt>) =
        attempts.iter().partition(|a| known.contains(a.test_id.as_str()));
    (owned.into_iter().cloned().collect(), orphans)
}

/// Runs every analysis over one dataset snapshot. Holds only static tables
/// and tunables, so one engine can be shared across requests.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: EngineConfig,
    graph: TopicDependencyGraph,
    weights: TopicWeightageMap,
    marking: MarkingTable,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        AnalyticsEngine {
            config,
            graph: TopicDependencyGraph::builtin(),
            weights: TopicWeightageMap::builtin(),
            marking: MarkingTable::default(),
        }
    }

    pub fn with_dependency_graph(mut self, graph: TopicDependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_weightage(mut self, weights: TopicWeightageMap) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_marking(mut self, marking: MarkingTable) -> Self {
        self.marking = marking;
        self
    }

    pub fn error_analysis(&self, dataset: &Dataset, attempts: &[QuestionAttempt]) -> ErrorAnalysis {
        let weak_topics = aggregator::weak_topics(attempts);
        ErrorAnalysis {
            total_errors: attempts.iter().filter(|a| a.status.is_error()).count(),
            pareto: aggregator::pareto(&weak_topics, self.config.pareto_top_topics),
            fatigue_curve: aggregator::fatigue_curve(attempts, self.config.fatigue_bucket_size),
            reasons: aggregator::reason_breakdown(attempts),
            subjects: aggregator::subject_breakdown(attempts),
            time_buckets: aggregator::time_buckets(attempts, &dataset.settings, &self.config),
            weak_topics,
        }
    }

    pub fn forecast<R: Rng + ?Sized>(&self, dataset: &Dataset, rng: &mut R) -> Option<SimulationResult> {
        RankSimulator::new(&self.config).simulate(&dataset.tests, &dataset.goals, rng)
    }

    pub fn report<R: Rng + ?Sized>(&self, dataset: &Dataset, rng: &mut R) -> AnalyticsReport {
        let (attempts, orphans) = partition_orphans(&dataset.tests, &dataset.attempts);
        if !orphans.is_empty() {
            warn!("{} attempts reference unknown tests and were ignored", orphans.len());
        }

        let errors = self.error_analysis(dataset, &attempts);
        let panic_events = detect_panic_events(&dataset.tests, &attempts, &self.marking, &self.config);
        let dependency_alerts = dependency_alerts(&errors.weak_topics, &self.graph);
        let guesses = profile_guesses(&attempts, &self.marking);
        let trend = TrendAnalyzer::new(&self.config).analyze(&dataset.tests, &dataset.settings);
        let forecast = self.forecast(dataset, rng);
        let roi = roi_points(&aggregator::topic_accuracy(&attempts), &self.weights, &self.config);

        let tests = chronological(&dataset.tests)
            .into_iter()
            .map(|t| TestSummary {
                test_id: t.id.clone(),
                name: t.name.clone(),
                date: t.date,
                total_marks: t.total_marks,
                rank: t.rank,
                subjects: t
                    .subjects
                    .iter()
                    .map(|s| SubjectSummary {
                        subject: s.subject.clone(),
                        marks: s.marks,
                        rank: s.rank,
                        metrics: s.metrics(),
                    })
                    .collect(),
            })
            .collect();

        info!(
            "report built: {} tests, {} attempts, {} weak topics, {} panic events",
            dataset.tests.len(),
            attempts.len(),
            errors.weak_topics.len(),
            panic_events.len()
        );

        AnalyticsReport {
            total_tests: dataset.tests.len(),
            total_attempts: attempts.len(),
            orphaned_attempts: orphans.len(),
            tests,
            errors,
            panic_events,
            dependency_alerts,
            guesses,
            trend,
            forecast,
            roi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_dataset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_orphans_are_counted_and_excluded() {
        let mut dataset = sample_dataset();
        let mut orphan = dataset.attempts[0].clone();
        orphan.test_id = "deleted-test".to_string();
        dataset.attempts.push(orphan);

        let engine = AnalyticsEngine::new(EngineConfig::default());
        let report = engine.report(&dataset, &mut StdRng::seed_from_u64(5));
        assert_eq!(report.orphaned_attempts, 1);
        assert_eq!(report.total_attempts, dataset.attempts.len() - 1);
    }

    #[test]
    fn test_empty_dataset_degrades_to_sentinels() {
        let engine = AnalyticsEngine::new(EngineConfig::default());
        let report = engine.report(&Dataset::default(), &mut StdRng::seed_from_u64(5));

        assert_eq!(report.total_tests, 0);
        assert!(report.errors.weak_topics.is_empty());
        assert!(report.errors.pareto.is_empty());
        assert!(report.errors.fatigue_curve.is_empty());
        assert!(report.panic_events.is_empty());
        assert!(report.dependency_alerts.is_empty());
        assert_eq!(report.guesses, GuessStats::default());
        assert!(report.trend.is_none());
        assert!(report.forecast.is_none());
        assert!(report.roi.is_empty());
    }

    #[test]
    fn test_sample_report_is_populated() {
        let engine = AnalyticsEngine::new(EngineConfig::default());
        let report = engine.report(&sample_dataset(), &mut StdRng::seed_from_u64(5));

        assert_eq!(report.orphaned_attempts, 0);
        assert!(!report.errors.weak_topics.is_empty());
        assert!(!report.panic_events.is_empty());
        assert!(report.trend.is_some());
        let forecast = report.forecast.unwrap();
        assert_eq!(forecast.goal.target_rank, 2500);
        assert!(report.errors.weak_topics.iter().all(|w| w.topic != "N/A"));
    }
}
