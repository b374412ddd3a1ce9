//! Effort/impact classification of topics for study prioritisation.

use log::debug;
use serde::Serialize;

use crate::aggregator::TopicAccuracy;
use crate::config::EngineConfig;
use crate::model::ErrorReason;
use crate::tables::{TopicWeightageMap, Weightage};

const IMPACT_SCALE: f64 = 10.0;
const EFFORT_SCALE: f64 = 15.0;
const ACCURACY_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quadrant {
    #[serde(rename = "Quick Wins")]
    QuickWins,
    #[serde(rename = "Big Bets")]
    BigBets,
    Maintenance,
    #[serde(rename = "Money Pits")]
    MoneyPits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiPoint {
    pub topic: String,
    pub subject: String,
    pub attempts: usize,
    pub wrong_count: usize,
    pub accuracy: f64,
    pub dominant_reason: Option<ErrorReason>,
    pub weightage: Weightage,
    pub effort: f64,
    pub impact: f64,
    pub quadrant: Quadrant,
}

/// Careless errors are cheap to fix, conceptual gaps are expensive.
pub fn effort_modifier(reason: Option<ErrorReason>) -> f64 {
    match reason {
        Some(ErrorReason::SillyMistake) | Some(ErrorReason::MisreadQuestion) => 0.4,
        Some(ErrorReason::ConceptualGap) => 1.5,
        _ => 1.0,
    }
}

/// Values equal to a threshold count as high.
///
/// Placement follows the thresholds alone. A High-weightage topic at 90%
/// accuracy with a single Silly Mistake scores impact 15 and effort about 8.2,
/// so with the default thresholds of 30 it lands in Maintenance, not Quick
/// Wins. It takes more wrong answers (four of ten: impact 60) to become a
/// Quick Win.
pub fn classify(impact: f64, effort: f64, config: &EngineConfig) -> Quadrant {
    let high_impact = impact >= config.roi_impact_threshold;
    let high_effort = effort >= config.roi_effort_threshold;
    match (high_impact, high_effort) {
        (true, true) => Quadrant::BigBets,
        (true, false) => Quadrant::QuickWins,
        (false, false) => Quadrant::Maintenance,
        (false, true) => Quadrant::MoneyPits,
    }
}

/// Scores every topic with at least `config.roi_min_attempts` attempts,
/// highest impact first.
pub fn roi_points(table: &[TopicAccuracy], weights: &TopicWeightageMap, config: &EngineConfig) -> Vec<RoiPoint> {
    let mut points: Vec<RoiPoint> = table
        .iter()
        .filter(|t| t.attempts > 0 && t.attempts >= config.roi_min_attempts)
        .map(|t| {
            let accuracy = t.accuracy();
            let dominant_reason = t.dominant_reason();
            let weightage = weights.weightage(&t.topic);
            let weight = weightage.multiplier();

            let impact = weight * t.wrong as f64 * IMPACT_SCALE;
            let effort = (1.0 / (accuracy + ACCURACY_FLOOR)) * weight * effort_modifier(dominant_reason) * EFFORT_SCALE;

            RoiPoint {
                topic: t.topic.clone(),
                subject: t.subject.clone(),
                attempts: t.attempts,
                wrong_count: t.wrong,
                accuracy,
                dominant_reason,
                weightage,
                effort,
                impact,
                quadrant: classify(impact, effort, config),
            }
        })
        .collect();

    points.sort_by(|a, b| {
        b.impact
            .total_cmp(&a.impact)
            .then_with(|| a.effort.total_cmp(&b.effort))
            .then_with(|| a.topic.cmp(&b.topic))
    });
    debug!("roi matrix: {} topics scored", points.len());
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn topic(name: &str, correct: usize, wrong: usize, unanswered: usize, reason: Option<ErrorReason>) -> TopicAccuracy {
        let mut reasons = BTreeMap::new();
        if let Some(reason) = reason {
            reasons.insert(reason, wrong.max(1));
        }
        TopicAccuracy {
            topic: name.to_string(),
            subject: "Physics".to_string(),
            attempts: correct + wrong + unanswered,
            correct,
            partial: 0,
            wrong,
            unanswered,
            reasons,
        }
    }

    fn weights() -> TopicWeightageMap {
        let mut map = TopicWeightageMap::new();
        map.insert("Optics", Weightage::High);
        map.insert("Rotation", Weightage::High);
        map.insert("Waves", Weightage::High);
        map.insert("Units", Weightage::Low);
        map
    }

    fn point<'a>(points: &'a [RoiPoint], name: &str) -> &'a RoiPoint {
        points.iter().find(|p| p.topic == name).unwrap()
    }

    #[test]
    fn test_one_point_per_quadrant() {
        let table = vec![
            topic("Optics", 9, 1, 0, Some(ErrorReason::SillyMistake)),
            topic("Rotation", 6, 4, 0, Some(ErrorReason::SillyMistake)),
            topic("Waves", 1, 4, 0, Some(ErrorReason::ConceptualGap)),
            topic("Units", 0, 2, 2, Some(ErrorReason::ConceptualGap)),
        ];
        let points = roi_points(&table, &weights(), &EngineConfig::default());

        let optics = point(&points, "Optics");
        assert!((optics.impact - 15.0).abs() < 1e-9);
        assert!(optics.effort < 30.0);
        assert_eq!(optics.quadrant, Quadrant::Maintenance);

        let rotation = point(&points, "Rotation");
        assert!((rotation.impact - 60.0).abs() < 1e-9);
        assert!((rotation.effort - 11.25).abs() < 1e-9);
        assert_eq!(rotation.quadrant, Quadrant::QuickWins);

        assert_eq!(point(&points, "Waves").quadrant, Quadrant::BigBets);

        let units = point(&points, "Units");
        assert!((units.impact - 14.0).abs() < 1e-9);
        assert_eq!(units.quadrant, Quadrant::MoneyPits);

        assert!(points.windows(2).all(|w| w[0].impact >= w[1].impact));
    }

    #[test]
    fn test_threshold_boundaries_count_as_high() {
        let config = EngineConfig::default();
        assert_eq!(classify(30.0, 30.0, &config), Quadrant::BigBets);
        assert_eq!(classify(30.0, 29.999, &config), Quadrant::QuickWins);
        assert_eq!(classify(29.999, 29.999, &config), Quadrant::Maintenance);
        assert_eq!(classify(29.999, 30.0, &config), Quadrant::MoneyPits);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let config = EngineConfig {
            roi_impact_threshold: 10.0,
            ..EngineConfig::default()
        };
        assert_eq!(classify(15.0, 5.0, &config), Quadrant::QuickWins);
    }

    #[test]
    fn test_sparse_topics_and_defaults() {
        let table = vec![
            topic("Optics", 1, 1, 0, None),
            topic("Unlisted", 2, 1, 0, None),
        ];
        let points = roi_points(&table, &weights(), &EngineConfig::default());
        assert_eq!(points.len(), 1);

        let unlisted = &points[0];
        assert_eq!(unlisted.weightage, Weightage::Medium);
        assert_eq!(unlisted.dominant_reason, None);
        assert!((unlisted.impact - 10.0).abs() < 1e-9);
        // accuracy 2/3, medium weight, neutral modifier
        let expected = 1.0 / (2.0 / 3.0 + 0.2) * 15.0;
        assert!((unlisted.effort - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_accuracy_is_finite() {
        let table = vec![topic("Units", 0, 3, 0, None)];
        let points = roi_points(&table, &weights(), &EngineConfig::default());
        assert!(points[0].effort.is_finite());
    }
}
