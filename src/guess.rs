//! Risk profile of attempts the student tagged as guesses.

use log::debug;
use serde::Serialize;

use crate::model::{AttemptStatus, ErrorReason, QuestionAttempt};
use crate::tables::MarkingTable;

/// How far a figure can be trusted as a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Confidence {
    #[default]
    Low,
}

/// `intuition_score` only sees guesses that were tagged, and tags are mostly
/// attached to wrong answers, so correct guesses are under-counted. It is
/// always reported with `Confidence::Low`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuessStats {
    pub total_guesses: usize,
    pub safe_guesses: usize,
    pub risky_guesses: usize,
    pub risky_misses: usize,
    pub correct_guesses: usize,
    pub intuition_score: f64,
    pub intuition_confidence: Confidence,
    pub net_score_impact: f64,
}

pub fn profile_guesses(attempts: &[QuestionAttempt], marking: &MarkingTable) -> GuessStats {
    let mut stats = GuessStats::default();

    for attempt in attempts.iter().filter(|a| a.error_reason == Some(ErrorReason::Guess)) {
        stats.total_guesses += 1;
        stats.net_score_impact += attempt.marks_awarded;

        if marking.scheme(attempt.question_type).has_negative_marking() {
            stats.risky_guesses += 1;
            if attempt.status == AttemptStatus::Wrong {
                stats.risky_misses += 1;
            }
        } else {
            stats.safe_guesses += 1;
        }

        if attempt.status == AttemptStatus::FullyCorrect {
            stats.correct_guesses += 1;
        }
    }

    if stats.total_guesses > 0 {
        stats.intuition_score = stats.correct_guesses as f64 / stats.total_guesses as f64 * 100.0;
    }

    debug!(
        "guess profile: {} guesses, {} risky, {} risky misses",
        stats.total_guesses, stats.risky_guesses, stats.risky_misses
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionType;

    fn guess(status: AttemptStatus, question_type: QuestionType, marks: f64) -> QuestionAttempt {
        QuestionAttempt {
            test_id: "t1".to_string(),
            subject: "Chemistry".to_string(),
            question_number: 1,
            status,
            topic: "Mole Concept".to_string(),
            marks_awarded: marks,
            error_reason: Some(ErrorReason::Guess),
            time_spent_seconds: Some(30.0),
            question_type,
        }
    }

    #[test]
    fn test_guess_classification() {
        let attempts = vec![
            guess(AttemptStatus::Wrong, QuestionType::SingleCorrect, -1.0),
            guess(AttemptStatus::FullyCorrect, QuestionType::SingleCorrect, 4.0),
            guess(AttemptStatus::Wrong, QuestionType::Numerical, 0.0),
            guess(AttemptStatus::Wrong, QuestionType::MultipleCorrect, -2.0),
        ];

        let stats = profile_guesses(&attempts, &MarkingTable::default());
        assert_eq!(stats.total_guesses, 4);
        assert_eq!(stats.safe_guesses, 1);
        assert_eq!(stats.risky_guesses, 3);
        assert_eq!(stats.risky_misses, 2);
        assert_eq!(stats.safe_guesses + stats.risky_guesses, stats.total_guesses);
        assert!(stats.risky_misses <= stats.risky_guesses);
        assert_eq!(stats.net_score_impact, 1.0);
        assert!((stats.intuition_score - 25.0).abs() < 1e-9);
        assert_eq!(stats.intuition_confidence, Confidence::Low);
    }

    #[test]
    fn test_untagged_attempts_ignored() {
        let mut attempt = guess(AttemptStatus::Wrong, QuestionType::SingleCorrect, -1.0);
        attempt.error_reason = Some(ErrorReason::SillyMistake);

        let stats = profile_guesses(&[attempt], &MarkingTable::default());
        assert_eq!(stats, GuessStats::default());
        assert_eq!(stats.intuition_score, 0.0);
    }
}
