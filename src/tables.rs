use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{MarkingScheme, QuestionType};

/// Marking scheme per question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkingTable {
    schemes: HashMap<QuestionType, MarkingScheme>,
}

impl Default for MarkingTable {
    fn default() -> Self {
        let mut schemes = HashMap::new();
        schemes.insert(QuestionType::SingleCorrect, MarkingScheme { positive: 4.0, negative: -1.0 });
        schemes.insert(QuestionType::MultipleCorrect, MarkingScheme { positive: 4.0, negative: -2.0 });
        schemes.insert(QuestionType::Numerical, MarkingScheme { positive: 4.0, negative: 0.0 });
        schemes.insert(QuestionType::MatrixMatch, MarkingScheme { positive: 3.0, negative: -1.0 });
        Self { schemes }
    }
}

impl MarkingTable {
    /// Replaces the scheme for one question type, keeping the others.
    pub fn with_scheme(mut self, question_type: QuestionType, scheme: MarkingScheme) -> Self {
        self.schemes.insert(question_type, scheme);
        self
    }

    /// Falls back to the single-correct scheme for types missing from the table.
    pub fn scheme(&self, question_type: QuestionType) -> MarkingScheme {
        self.schemes
            .get(&question_type)
            .or_else(|| self.schemes.get(&QuestionType::SingleCorrect))
            .copied()
            .unwrap_or(MarkingScheme { positive: 4.0, negative: -1.0 })
    }
}

/// Topic -> ordered prerequisite topics. Assumed loop-free; not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicDependencyGraph {
    prerequisites: HashMap<String, Vec<String>>,
}

impl TopicDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, topic: S, prerequisites: Vec<String>) {
        self.prerequisites.insert(topic.into(), prerequisites);
    }

    pub fn prerequisites(&self, topic: &str) -> &[String] {
        self.prerequisites.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    /// Prerequisite chains for the common engineering-entrance syllabus.
    pub fn builtin() -> Self {
        let table: &[(&str, &[&str])] = &[
            // Physics
            ("Rotational Motion", &["Laws of Motion", "Work Energy Power"]),
            ("Work Energy Power", &["Laws of Motion", "Kinematics"]),
            ("Laws of Motion", &["Kinematics", "Vectors"]),
            ("Kinematics", &["Vectors"]),
            ("Gravitation", &["Laws of Motion", "Rotational Motion"]),
            ("Simple Harmonic Motion", &["Laws of Motion", "Work Energy Power"]),
            ("Electrostatics", &["Vectors"]),
            ("Current Electricity", &["Electrostatics"]),
            ("Magnetism", &["Current Electricity", "Vectors"]),
            ("Electromagnetic Induction", &["Magnetism"]),
            // Chemistry
            ("Chemical Equilibrium", &["Mole Concept", "Thermodynamics"]),
            ("Ionic Equilibrium", &["Chemical Equilibrium"]),
            ("Electrochemistry", &["Redox Reactions", "Ionic Equilibrium"]),
            ("Chemical Kinetics", &["Mole Concept"]),
            ("Organic Reaction Mechanisms", &["General Organic Chemistry"]),
            ("Coordination Compounds", &["Chemical Bonding"]),
            // Mathematics
            ("Definite Integration", &["Indefinite Integration", "Limits"]),
            ("Indefinite Integration", &["Differentiation"]),
            ("Differentiation", &["Limits", "Functions"]),
            ("Limits", &["Functions"]),
            ("Differential Equations", &["Indefinite Integration"]),
            ("Probability", &["Permutations and Combinations"]),
            ("Conic Sections", &["Straight Lines"]),
            ("Complex Numbers", &["Quadratic Equations"]),
        ];

        let mut graph = Self::new();
        for (topic, prerequisites) in table {
            graph.insert(*topic, prerequisites.iter().map(|p| p.to_string()).collect());
        }
        graph
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weightage {
    High,
    #[default]
    Medium,
    Low,
}

impl Weightage {
    pub fn multiplier(self) -> f64 {
        match self {
            Weightage::High => 1.5,
            Weightage::Medium => 1.0,
            Weightage::Low => 0.7,
        }
    }
}

/// Topic -> importance tier. Unknown topics are treated as Medium.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicWeightageMap {
    weights: HashMap<String, Weightage>,
}

impl TopicWeightageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, topic: S, weightage: Weightage) {
        self.weights.insert(topic.into(), weightage);
    }

    pub fn weightage(&self, topic: &str) -> Weightage {
        self.weights.get(topic).copied().unwrap_or_default()
    }

    pub fn builtin() -> Self {
        let table: &[(&str, Weightage)] = &[
            ("Rotational Motion", Weightage::High),
            ("Electrostatics", Weightage::High),
            ("Current Electricity", Weightage::High),
            ("Magnetism", Weightage::High),
            ("Laws of Motion", Weightage::Medium),
            ("Kinematics", Weightage::Low),
            ("Vectors", Weightage::Low),
            ("Chemical Equilibrium", Weightage::High),
            ("Electrochemistry", Weightage::High),
            ("Organic Reaction Mechanisms", Weightage::High),
            ("Coordination Compounds", Weightage::Medium),
            ("Mole Concept", Weightage::Low),
            ("Definite Integration", Weightage::High),
            ("Differential Equations", Weightage::Medium),
            ("Probability", Weightage::High),
            ("Conic Sections", Weightage::High),
            ("Complex Numbers", Weightage::Medium),
            ("Functions", Weightage::Low),
        ];

        let mut map = Self::new();
        for (topic, weightage) in table {
            map.insert(*topic, *weightage);
        }
        map
    }
}

/// The three lookup tables the engine runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTables {
    pub graph: TopicDependencyGraph,
    pub weights: TopicWeightageMap,
    pub marking: MarkingTable,
}

impl Default for StaticTables {
    fn default() -> Self {
        StaticTables {
            graph: TopicDependencyGraph::builtin(),
            weights: TopicWeightageMap::builtin(),
            marking: MarkingTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_lookups_fall_back() {
        let graph = TopicDependencyGraph::builtin();
        assert!(graph.prerequisites("Underwater Basket Weaving").is_empty());
        assert_eq!(graph.prerequisites("Kinematics"), &["Vectors".to_string()]);

        let weights = TopicWeightageMap::new();
        assert_eq!(weights.weightage("Anything"), Weightage::Medium);
    }

    #[test]
    fn test_marking_table_fallback() {
        let table = MarkingTable::default();
        assert!(!table.scheme(QuestionType::Numerical).has_negative_marking());
        assert!(table.scheme(QuestionType::MultipleCorrect).has_negative_marking());
    }

    #[test]
    fn test_with_scheme_overrides_one_type() {
        let table = MarkingTable::default()
            .with_scheme(QuestionType::Numerical, MarkingScheme { positive: 4.0, negative: -1.0 });
        assert!(table.scheme(QuestionType::Numerical).has_negative_marking());
        assert_eq!(table.scheme(QuestionType::MatrixMatch).positive, 3.0);
    }

    #[test]
    fn test_graph_deserializes_from_plain_map() {
        let graph: TopicDependencyGraph =
            serde_json::from_str(r#"{ "Limits": ["Functions"] }"#).unwrap();
        assert_eq!(graph.prerequisites("Limits"), &["Functions".to_string()]);
    }
}
