//! Error aggregation: weak-topic ranking, Pareto impact, fatigue curve and
//! the per-topic accuracy table used by the ROI classifier.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{AttemptStatus, ErrorReason, QuestionAttempt, UserSettings};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakTopicStat {
    pub topic: String,
    pub error_count: usize,
    pub tests_affected: usize,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoPoint {
    pub topic: String,
    pub error_count: usize,
    pub cumulative_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatigueBucket {
    pub label: String,
    pub first_question: u32,
    pub last_question: u32,
    pub attempts: usize,
    pub errors: usize,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonStat {
    pub reason: ErrorReason,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectErrorStat {
    pub subject: String,
    pub attempts: usize,
    pub errors: usize,
    pub error_rate: f64,
}

/// Pace of an attempt relative to the subject's target time per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TimeBucket {
    Rushed,
    OnPace,
    Overtime,
    Untimed,
}

impl TimeBucket {
    pub const ALL: [TimeBucket; 4] = [
        TimeBucket::Rushed,
        TimeBucket::OnPace,
        TimeBucket::Overtime,
        TimeBucket::Untimed,
    ];

    pub fn classify(time_spent: Option<f64>, target_seconds: f64) -> TimeBucket {
        match time_spent {
            Some(t) if t > 0.0 && target_seconds > 0.0 => {
                let ratio = t / target_seconds;
                if ratio < 0.5 {
                    TimeBucket::Rushed
                } else if ratio <= 1.5 {
                    TimeBucket::OnPace
                } else {
                    TimeBucket::Overtime
                }
            }
            _ => TimeBucket::Untimed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucketStat {
    pub bucket: TimeBucket,
    pub attempts: usize,
    pub errors: usize,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAccuracy {
    pub topic: String,
    pub subject: String,
    pub attempts: usize,
    pub correct: usize,
    pub partial: usize,
    pub wrong: usize,
    pub unanswered: usize,
    pub reasons: BTreeMap<ErrorReason, usize>,
}

impl TopicAccuracy {
    pub fn accuracy(&self) -> f64 {
        if self.attempts > 0 {
            self.correct as f64 / self.attempts as f64
        } else {
            0.0
        }
    }

    /// Most frequent error reason; ties go to the alphabetically first label.
    pub fn dominant_reason(&self) -> Option<ErrorReason> {
        self.reasons
            .iter()
            .filter(|(_, &count)| count > 0)
            .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then_with(|| rb.label().cmp(ra.label())))
            .map(|(reason, _)| *reason)
    }
}

fn rate(errors: usize, attempts: usize) -> f64 {
    if attempts > 0 {
        errors as f64 / attempts as f64 * 100.0
    } else {
        0.0
    }
}

/// Ranks topics by wrong/partially-correct count, most errors first.
/// Equal counts are ordered alphabetically so the ranking is stable across runs.
pub fn weak_topics(attempts: &[QuestionAttempt]) -> Vec<WeakTopicStat> {
    let mut groups: HashMap<&str, (usize, HashSet<&str>, &str)> = HashMap::new();

    for attempt in attempts.iter().filter(|a| a.status.is_error() && a.has_topic()) {
        let entry = groups
            .entry(attempt.topic.trim())
            .or_insert_with(|| (0, HashSet::new(), attempt.subject.as_str()));
        entry.0 += 1;
        entry.1.insert(attempt.test_id.as_str());
    }

    let mut ranking: Vec<WeakTopicStat> = groups
        .into_iter()
        .map(|(topic, (error_count, tests, subject))| WeakTopicStat {
            topic: topic.to_string(),
            error_count,
            tests_affected: tests.len(),
            subject: subject.to_string(),
        })
        .collect();

    ranking.sort_by(|a, b| b.error_count.cmp(&a.error_count).then_with(|| a.topic.cmp(&b.topic)));
    debug!("weak topic ranking built: {} topics", ranking.len());
    ranking
}

/// Cumulative share of all ranked errors covered by the first `top_n` topics.
pub fn pareto(ranking: &[WeakTopicStat], top_n: usize) -> Vec<ParetoPoint> {
    let total: usize = ranking.iter().map(|s| s.error_count).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut running = 0;
    ranking
        .iter()
        .take(top_n)
        .map(|stat| {
            running += stat.error_count;
            ParetoPoint {
                topic: stat.topic.clone(),
                error_count: stat.error_count,
                cumulative_percent: running as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}

/// Longest run of question blocks the fatigue curve zero-fills. Wider spans
/// only report the blocks that were attempted.
pub const MAX_FILLED_BUCKETS: u32 = 200;

/// Error rate per block of `bucket_size` question numbers (1-10, 11-20, ...),
/// computed over every attempt. Empty blocks between populated ones are kept
/// so the curve has no gaps, as long as the whole span stays within
/// [`MAX_FILLED_BUCKETS`].
pub fn fatigue_curve(attempts: &[QuestionAttempt], bucket_size: u32) -> Vec<FatigueBucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets: BTreeMap<u32, (usize, usize)> = BTreeMap::new();

    for attempt in attempts {
        let index = attempt.question_number.saturating_sub(1) / bucket_size;
        let entry = buckets.entry(index).or_insert((0, 0));
        entry.0 += 1;
        if attempt.status.is_error() {
            entry.1 += 1;
        }
    }

    let last = match buckets.keys().next_back() {
        Some(&last) => last,
        None => return Vec::new(),
    };

    let indices: Vec<u32> = if last < MAX_FILLED_BUCKETS {
        (0..=last).collect()
    } else {
        debug!("fatigue curve spans {} blocks, skipping empty ones", last.saturating_add(1));
        buckets.keys().copied().collect()
    };

    indices
        .into_iter()
        .map(|index| {
            let (count, errors) = buckets.get(&index).copied().unwrap_or((0, 0));
            let first_question = index.saturating_mul(bucket_size).saturating_add(1);
            let last_question = first_question.saturating_add(bucket_size - 1);
            FatigueBucket {
                label: format!("{}-{}", first_question, last_question),
                first_question,
                last_question,
                attempts: count,
                errors,
                error_rate: rate(errors, count),
            }
        })
        .collect()
}

/// Share of each tagged error reason among errors that carry a tag.
pub fn reason_breakdown(attempts: &[QuestionAttempt]) -> Vec<ReasonStat> {
    let mut counts: BTreeMap<ErrorReason, usize> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.status.is_error()) {
        if let Some(reason) = attempt.error_reason {
            *counts.entry(reason).or_insert(0) += 1;
        }
    }

    let total: usize = counts.values().sum();
    let mut stats: Vec<ReasonStat> = counts
        .into_iter()
        .map(|(reason, count)| ReasonStat {
            reason,
            count,
            percent: rate(count, total),
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.label().cmp(b.reason.label())));
    stats
}

pub fn subject_breakdown(attempts: &[QuestionAttempt]) -> Vec<SubjectErrorStat> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for attempt in attempts {
        let entry = groups.entry(attempt.subject.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if attempt.status.is_error() {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(subject, (count, errors))| SubjectErrorStat {
            subject: subject.to_string(),
            attempts: count,
            errors,
            error_rate: rate(errors, count),
        })
        .collect()
}

/// Groups attempts by pace. The target comes from the user's per-subject
/// setting, or `config.default_target_seconds` when the subject has none.
pub fn time_buckets(
    attempts: &[QuestionAttempt],
    settings: &UserSettings,
    config: &EngineConfig,
) -> Vec<TimeBucketStat> {
    let mut counts: HashMap<TimeBucket, (usize, usize)> = HashMap::new();

    for attempt in attempts {
        let target = settings
            .target_seconds_per_question
            .get(&attempt.subject)
            .copied()
            .unwrap_or(config.default_target_seconds);
        let bucket = TimeBucket::classify(attempt.time_spent_seconds, target);
        let entry = counts.entry(bucket).or_insert((0, 0));
        entry.0 += 1;
        if attempt.status.is_error() {
            entry.1 += 1;
        }
    }

    TimeBucket::ALL
        .iter()
        .map(|&bucket| {
            let (count, errors) = counts.get(&bucket).copied().unwrap_or((0, 0));
            TimeBucketStat {
                bucket,
                attempts: count,
                errors,
                error_rate: rate(errors, count),
            }
        })
        .collect()
}

/// Per-topic outcome counts over every tagged attempt, sorted by topic.
pub fn topic_accuracy(attempts: &[QuestionAttempt]) -> Vec<TopicAccuracy> {
    let mut groups: BTreeMap<&str, TopicAccuracy> = BTreeMap::new();

    for attempt in attempts.iter().filter(|a| a.has_topic()) {
        let topic = attempt.topic.trim();
        let entry = groups.entry(topic).or_insert_with(|| TopicAccuracy {
            topic: topic.to_string(),
            subject: attempt.subject.clone(),
            attempts: 0,
            correct: 0,
            partial: 0,
            wrong: 0,
            unanswered: 0,
            reasons: BTreeMap::new(),
        });

        entry.attempts += 1;
        match attempt.status {
            AttemptStatus::FullyCorrect => entry.correct += 1,
            AttemptStatus::PartiallyCorrect => entry.partial += 1,
            AttemptStatus::Wrong => entry.wrong += 1,
            AttemptStatus::Unanswered => entry.unanswered += 1,
        }
        if attempt.status.is_error() {
            if let Some(reason) = attempt.error_reason {
                *entry.reasons.entry(reason).or_insert(0) += 1;
            }
        }
    }

    groups.into_values().collect()
}
