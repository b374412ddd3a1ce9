//! Panic detection: runs of consecutive wrong/unanswered questions in a test.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{QuestionAttempt, TestRecord};
use crate::tables::MarkingTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanicEvent {
    pub test_id: String,
    pub test_name: String,
    pub start_question: u32,
    pub end_question: u32,
    pub chain_length: usize,
    pub lost_marks: f64,
}

#[derive(Debug, Default)]
struct Chain {
    start: u32,
    end: u32,
    length: usize,
    lost_marks: f64,
}

impl Chain {
    fn extend(&mut self, question: u32, lost: f64) {
        if self.length == 0 {
            self.start = question;
        }
        self.end = question;
        self.length += 1;
        self.lost_marks += lost;
    }
}

/// Scans one test's attempts in question order and returns every chain of at
/// least `min_chain` consecutive failures, including a chain still open at
/// the final question.
pub fn scan_test(
    test: &TestRecord,
    attempts: &[&QuestionAttempt],
    marking: &MarkingTable,
    min_chain: usize,
) -> Vec<PanicEvent> {
    let mut ordered: Vec<&QuestionAttempt> = attempts.to_vec();
    ordered.sort_by_key(|a| a.question_number);

    let mut events = Vec::new();
    let mut chain = Chain::default();
    let mut flush = |chain: &mut Chain| {
        if chain.length >= min_chain {
            events.push(PanicEvent {
                test_id: test.id.clone(),
                test_name: test.name.clone(),
                start_question: chain.start,
                end_question: chain.end,
                chain_length: chain.length,
                lost_marks: chain.lost_marks,
            });
        }
        *chain = Chain::default();
    };

    for attempt in ordered {
        if attempt.status.extends_failure_chain() {
            let lost = marking.scheme(attempt.question_type).marks_lost(attempt.status);
            chain.extend(attempt.question_number, lost);
        } else {
            flush(&mut chain);
        }
    }
    flush(&mut chain);

    events
}

/// Panic events across all tests, costliest first, capped at
/// `config.panic_top_events`. Attempts for unknown tests are skipped.
pub fn detect_panic_events(
    tests: &[TestRecord],
    attempts: &[QuestionAttempt],
    marking: &MarkingTable,
    config: &EngineConfig,
) -> Vec<PanicEvent> {
    let mut by_test: HashMap<&str, Vec<&QuestionAttempt>> = HashMap::new();
    for attempt in attempts {
        by_test.entry(attempt.test_id.as_str()).or_default().push(attempt);
    }

    let mut events: Vec<PanicEvent> = tests
        .iter()
        .filter_map(|test| by_test.get(test.id.as_str()).map(|a| (test, a)))
        .flat_map(|(test, test_attempts)| scan_test(test, test_attempts, marking, config.panic_min_chain))
        .collect();

    debug!("panic scan found {} chains", events.len());

    events.sort_by(|a, b| {
        b.lost_marks
            .total_cmp(&a.lost_marks)
            .then_with(|| a.test_id.cmp(&b.test_id))
            .then_with(|| a.start_question.cmp(&b.start_question))
    });
    events.truncate(config.panic_top_events);
    events
}
