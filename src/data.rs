use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    AttemptStatus, ErrorReason, LongTermGoal, MarkingScheme, QuestionAttempt, QuestionType, SubjectScore,
    TestRecord, UserSettings, UNTAGGED_TOPIC,
};
use crate::tables::{MarkingTable, StaticTables, TopicDependencyGraph, TopicWeightageMap};

/// One student's full history: the snapshot every analysis runs over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub tests: Vec<TestRecord>,
    #[serde(default)]
    pub attempts: Vec<QuestionAttempt>,
    #[serde(default)]
    pub goals: Vec<LongTermGoal>,
    #[serde(default)]
    pub settings: UserSettings,
}

/// Flat CSV layout of a question log. Only the first four columns are required.
#[derive(Debug, Deserialize)]
struct AttemptRow {
    test_id: String,
    subject: String,
    question_number: u32,
    status: AttemptStatus,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    marks_awarded: Option<f64>,
    #[serde(default)]
    error_reason: Option<ErrorReason>,
    #[serde(default)]
    time_spent_seconds: Option<f64>,
    #[serde(default)]
    question_type: Option<QuestionType>,
}

/// Parses a question log. Rows without a test id or with question number 0
/// are skipped with a warning; malformed rows are an error.
pub fn read_attempts<R: Read>(reader: R) -> Result<Vec<QuestionAttempt>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut attempts = Vec::new();

    for (line, result) in rdr.deserialize::<AttemptRow>().enumerate() {
        let row = result?;
        if row.test_id.is_empty() || row.question_number == 0 {
            warn!("skipping attempt row {}: missing test id or question number", line + 1);
            continue;
        }
        attempts.push(QuestionAttempt {
            test_id: row.test_id,
            subject: row.subject,
            question_number: row.question_number,
            status: row.status,
            topic: row.topic.unwrap_or_else(|| UNTAGGED_TOPIC.to_string()),
            marks_awarded: row.marks_awarded.unwrap_or(0.0),
            error_reason: row.error_reason,
            time_spent_seconds: row.time_spent_seconds,
            question_type: row.question_type.unwrap_or_default(),
        });
    }

    Ok(attempts)
}

pub fn load_attempts_csv<P: AsRef<Path>>(path: P) -> Result<Vec<QuestionAttempt>> {
    read_attempts(File::open(path)?)
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_tests_json<P: AsRef<Path>>(path: P) -> Result<Vec<TestRecord>> {
    load_json(path)
}

pub fn load_goals_json<P: AsRef<Path>>(path: P) -> Result<Vec<LongTermGoal>> {
    load_json(path)
}

pub fn load_settings_json<P: AsRef<Path>>(path: P) -> Result<UserSettings> {
    load_json(path)
}

/// Loads `tests.json`, `attempts.csv`, `goals.json` and `settings.json` from
/// a directory. Missing files leave the corresponding collection empty.
pub fn load_dataset<P: AsRef<Path>>(dir: P) -> Result<Dataset> {
    let dir = dir.as_ref();
    let mut dataset = Dataset::default();

    let tests = dir.join("tests.json");
    if tests.exists() {
        dataset.tests = load_tests_json(&tests)?;
    }
    let attempts = dir.join("attempts.csv");
    if attempts.exists() {
        dataset.attempts = load_attempts_csv(&attempts)?;
    }
    let goals = dir.join("goals.json");
    if goals.exists() {
        dataset.goals = load_goals_json(&goals)?;
    }
    let settings = dir.join("settings.json");
    if settings.exists() {
        dataset.settings = load_settings_json(&settings)?;
    }

    info!(
        "loaded {} tests and {} attempts from {}",
        dataset.tests.len(),
        dataset.attempts.len(),
        dir.display()
    );
    Ok(dataset)
}

/// Loads `dependencies.json`, `weightage.json` and `marking.json` from a
/// directory. The graph and weightage files replace the built-in tables;
/// marking entries override the default scheme of the question types they name.
pub fn load_tables<P: AsRef<Path>>(dir: P) -> Result<StaticTables> {
    let dir = dir.as_ref();
    let mut tables = StaticTables::default();

    let dependencies = dir.join("dependencies.json");
    if dependencies.exists() {
        tables.graph = load_json::<TopicDependencyGraph, _>(&dependencies)?;
        if tables.graph.is_empty() {
            warn!("{} is empty, no dependency alerts will be raised", dependencies.display());
        }
    }
    let weightage = dir.join("weightage.json");
    if weightage.exists() {
        tables.weights = load_json::<TopicWeightageMap, _>(&weightage)?;
    }
    let marking = dir.join("marking.json");
    if marking.exists() {
        let overrides: HashMap<QuestionType, MarkingScheme> = load_json(&marking)?;
        tables.marking = overrides
            .into_iter()
            .fold(MarkingTable::default(), |table, (question_type, scheme)| {
                table.with_scheme(question_type, scheme)
            });
    }

    info!("dependency graph covers {} topics", tables.graph.len());
    Ok(tables)
}

// Demo history served when no data directory is configured.
pub fn sample_dataset() -> Dataset {
    let history = [
        ("mock-01", "Full Syllabus Mock 1", (2024, 1, 7), 118.0, 9800),
        ("mock-02", "Full Syllabus Mock 2", (2024, 1, 21), 131.0, 7600),
        ("mock-03", "Full Syllabus Mock 3", (2024, 2, 4), 127.0, 8100),
        ("mock-04", "Full Syllabus Mock 4", (2024, 2, 18), 149.0, 5200),
        ("mock-05", "Full Syllabus Mock 5", (2024, 3, 3), 162.0, 3900),
    ];

    let tests = history
        .iter()
        .filter_map(|&(id, name, (y, m, d), marks, rank)| {
            Some(TestRecord {
                id: id.to_string(),
                name: name.to_string(),
                date: NaiveDate::from_ymd_opt(y, m, d)?,
                total_marks: marks,
                max_marks: Some(300.0),
                rank: Some(rank),
                subjects: vec![
                    SubjectScore {
                        subject: "Physics".to_string(),
                        marks: marks * 0.3,
                        rank: None,
                        correct: 12,
                        wrong: 7,
                        unanswered: 6,
                        partial: 0,
                    },
                    SubjectScore {
                        subject: "Chemistry".to_string(),
                        marks: marks * 0.4,
                        rank: None,
                        correct: 15,
                        wrong: 5,
                        unanswered: 5,
                        partial: 0,
                    },
                    SubjectScore {
                        subject: "Mathematics".to_string(),
                        marks: marks * 0.3,
                        rank: None,
                        correct: 11,
                        wrong: 8,
                        unanswered: 5,
                        partial: 1,
                    },
                ],
            })
        })
        .collect();

    use AttemptStatus::{FullyCorrect as C, PartiallyCorrect as P, Unanswered as U, Wrong as W};
    use ErrorReason::{CalculationError, ConceptualGap, Guess, MisreadQuestion, SillyMistake};

    let questions: [(&str, &str, QuestionType); 12] = [
        ("Physics", "Kinematics", QuestionType::SingleCorrect),
        ("Physics", "Laws of Motion", QuestionType::SingleCorrect),
        ("Physics", "Rotational Motion", QuestionType::MultipleCorrect),
        ("Physics", "Electrostatics", QuestionType::Numerical),
        ("Chemistry", "Mole Concept", QuestionType::SingleCorrect),
        ("Chemistry", "Chemical Equilibrium", QuestionType::SingleCorrect),
        ("Chemistry", "Electrochemistry", QuestionType::Numerical),
        ("Chemistry", UNTAGGED_TOPIC, QuestionType::SingleCorrect),
        ("Mathematics", "Limits", QuestionType::SingleCorrect),
        ("Mathematics", "Differentiation", QuestionType::SingleCorrect),
        ("Mathematics", "Definite Integration", QuestionType::MultipleCorrect),
        ("Mathematics", "Probability", QuestionType::SingleCorrect),
    ];

    // one row of outcomes per mock, one column per question slot above
    let outcomes = [
        [C, W, W, W, C, P, C, W, C, W, W, C],
        [C, C, W, U, C, W, C, C, W, W, U, C],
        [C, W, W, W, U, C, W, C, C, C, W, W],
        [C, C, P, C, C, W, C, C, C, W, W, C],
        [C, C, W, C, C, C, C, W, C, C, U, U],
    ];
    let reasons = [
        Some(ConceptualGap),
        Some(SillyMistake),
        Some(Guess),
        Some(CalculationError),
        Some(MisreadQuestion),
    ];

    let mut attempts = Vec::new();
    for (t, row) in outcomes.iter().enumerate() {
        for (q, &status) in row.iter().enumerate() {
            let (subject, topic, question_type) = questions[q];
            let marks_awarded = match (status, question_type) {
                (C, _) => 4.0,
                (P, _) => 2.0,
                (W, QuestionType::MultipleCorrect) => -2.0,
                (W, QuestionType::Numerical) => 0.0,
                (W, _) => -1.0,
                (U, _) => 0.0,
            };
            let error_reason = if status == W || status == P {
                reasons[(t + q) % reasons.len()]
            } else {
                None
            };
            attempts.push(QuestionAttempt {
                test_id: history[t].0.to_string(),
                subject: subject.to_string(),
                question_number: q as u32 + 1,
                status,
                topic: topic.to_string(),
                marks_awarded,
                error_reason,
                time_spent_seconds: Some(40.0 + ((t * 7 + q * 13) % 9) as f64 * 25.0),
                question_type,
            });
        }
    }

    Dataset {
        tests,
        attempts,
        goals: vec![
            LongTermGoal {
                text: "Finish NCERT chemistry revision".to_string(),
                completed: true,
            },
            LongTermGoal {
                text: "Reach AIR under 2500 in JEE Main".to_string(),
                completed: false,
            },
        ],
        settings: UserSettings::default(),
    }
}
