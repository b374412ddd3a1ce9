use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Topic label used by the logging UI when a question was never classified.
pub const UNTAGGED_TOPIC: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttemptStatus {
    #[serde(rename = "Fully Correct", alias = "FullyCorrect", alias = "Correct")]
    FullyCorrect,
    #[serde(rename = "Partially Correct", alias = "PartiallyCorrect", alias = "Partial")]
    PartiallyCorrect,
    #[serde(alias = "Incorrect")]
    Wrong,
    #[serde(alias = "Skipped")]
    Unanswered,
}

impl AttemptStatus {
    /// Wrong and partially-correct answers both cost marks and count as errors.
    pub fn is_error(self) -> bool {
        matches!(self, AttemptStatus::Wrong | AttemptStatus::PartiallyCorrect)
    }

    /// Statuses that keep a panic chain alive.
    pub fn extends_failure_chain(self) -> bool {
        matches!(self, AttemptStatus::Wrong | AttemptStatus::Unanswered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorReason {
    #[serde(rename = "Silly Mistake", alias = "SillyMistake")]
    SillyMistake,
    #[serde(rename = "Conceptual Gap", alias = "ConceptualGap", alias = "Conceptual Error")]
    ConceptualGap,
    #[serde(rename = "Misread Question", alias = "MisreadQuestion")]
    MisreadQuestion,
    #[serde(rename = "Calculation Error", alias = "CalculationError")]
    CalculationError,
    #[serde(rename = "Time Pressure", alias = "TimePressure")]
    TimePressure,
    Guess,
    #[serde(other)]
    Other,
}

impl ErrorReason {
    pub fn label(self) -> &'static str {
        match self {
            ErrorReason::SillyMistake => "Silly Mistake",
            ErrorReason::ConceptualGap => "Conceptual Gap",
            ErrorReason::MisreadQuestion => "Misread Question",
            ErrorReason::CalculationError => "Calculation Error",
            ErrorReason::TimePressure => "Time Pressure",
            ErrorReason::Guess => "Guess",
            ErrorReason::Other => "Other",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "Single Correct", alias = "SingleCorrect", alias = "MCQ")]
    SingleCorrect,
    #[serde(rename = "Multiple Correct", alias = "MultipleCorrect")]
    MultipleCorrect,
    #[serde(alias = "Integer", alias = "Numeric")]
    Numerical,
    #[serde(rename = "Matrix Match", alias = "MatrixMatch")]
    MatrixMatch,
}

/// Positive and negative point values for one question type.
/// `negative` is stored as the (usually negative) delta applied on a wrong answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkingScheme {
    pub positive: f64,
    pub negative: f64,
}

impl MarkingScheme {
    pub fn has_negative_marking(&self) -> bool {
        self.negative != 0.0
    }

    /// Marks forfeited relative to a full-credit answer.
    pub fn marks_lost(&self, status: AttemptStatus) -> f64 {
        match status {
            AttemptStatus::Wrong => self.positive + self.negative.abs(),
            _ => self.positive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAttempt {
    pub test_id: String,
    pub subject: String,
    pub question_number: u32,
    pub status: AttemptStatus,
    pub topic: String,
    pub marks_awarded: f64,
    #[serde(default)]
    pub error_reason: Option<ErrorReason>,
    #[serde(default)]
    pub time_spent_seconds: Option<f64>,
    #[serde(default)]
    pub question_type: QuestionType,
}

impl QuestionAttempt {
    pub fn has_topic(&self) -> bool {
        let topic = self.topic.trim();
        !topic.is_empty() && topic != UNTAGGED_TOPIC
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub marks: f64,
    #[serde(default)]
    pub rank: Option<u32>,
    pub correct: u32,
    pub wrong: u32,
    pub unanswered: u32,
    #[serde(default)]
    pub partial: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubjectMetrics {
    pub accuracy: f64,
    pub attempt_rate: f64,
}

impl SubjectScore {
    pub fn attempted(&self) -> u32 {
        self.correct + self.wrong + self.partial
    }

    pub fn metrics(&self) -> SubjectMetrics {
        let attempted = self.attempted();
        let total = attempted + self.unanswered;
        SubjectMetrics {
            accuracy: if attempted > 0 { self.correct as f64 / attempted as f64 * 100.0 } else { 0.0 },
            attempt_rate: if total > 0 { attempted as f64 / total as f64 * 100.0 } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub total_marks: f64,
    #[serde(default)]
    pub max_marks: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub subjects: Vec<SubjectScore>,
}

/// Returns the records ordered by date, ties kept in input order.
pub fn chronological(tests: &[TestRecord]) -> Vec<&TestRecord> {
    let mut ordered: Vec<&TestRecord> = tests.iter().collect();
    ordered.sort_by_key(|t| t.date);
    ordered
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermGoal {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub cohort_size: Option<u32>,
    #[serde(default)]
    pub target_seconds_per_question: HashMap<String, f64>,
}
