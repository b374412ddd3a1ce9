//! Root-cause detection over the prerequisite graph.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::aggregator::WeakTopicStat;
use crate::tables::TopicDependencyGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyAlert {
    pub symptom_topic: String,
    pub root_cause_topic: String,
    pub error_count: usize,
}

/// Flags every weak topic whose direct prerequisite is also weak.
///
/// Propagation is single-hop: a prerequisite's own prerequisites are not
/// followed.
pub fn dependency_alerts(ranking: &[WeakTopicStat], graph: &TopicDependencyGraph) -> Vec<DependencyAlert> {
    let weak: HashSet<&str> = ranking.iter().map(|s| s.topic.as_str()).collect();

    let mut alerts: Vec<DependencyAlert> = ranking
        .iter()
        .flat_map(|stat| {
            let weak = &weak;
            graph
                .prerequisites(&stat.topic)
                .iter()
                .filter(move |prerequisite| weak.contains(prerequisite.as_str()))
                .map(move |prerequisite| DependencyAlert {
                    symptom_topic: stat.topic.clone(),
                    root_cause_topic: prerequisite.clone(),
                    error_count: stat.error_count,
                })
        })
        .collect();

    // stable sort keeps prerequisite order within one symptom topic
    alerts.sort_by(|a, b| {
        b.error_count
            .cmp(&a.error_count)
            .then_with(|| a.symptom_topic.cmp(&b.symptom_topic))
    });
    debug!("{} dependency alerts raised", alerts.len());
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(topic: &str, errors: usize) -> WeakTopicStat {
        WeakTopicStat {
            topic: topic.to_string(),
            error_count: errors,
            tests_affected: 1,
            subject: "Maths".to_string(),
        }
    }

    fn graph() -> TopicDependencyGraph {
        let mut graph = TopicDependencyGraph::new();
        graph.insert("Integration", vec!["Differentiation".to_string(), "Limits".to_string()]);
        graph.insert("Differentiation", vec!["Functions".to_string()]);
        graph
    }

    #[test]
    fn test_no_alert_when_prerequisite_is_healthy() {
        let alerts = dependency_alerts(&[stat("Integration", 4)], &graph());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_alert_when_prerequisite_is_weak() {
        let alerts = dependency_alerts(&[stat("Integration", 4), stat("Limits", 1)], &graph());
        assert_eq!(
            alerts,
            vec![DependencyAlert {
                symptom_topic: "Integration".to_string(),
                root_cause_topic: "Limits".to_string(),
                error_count: 4,
            }]
        );
    }

    #[test]
    fn test_single_hop_only() {
        // Functions is weak but only reachable from Integration through Differentiation.
        let ranking = [stat("Integration", 5), stat("Differentiation", 3), stat("Functions", 2)];
        let alerts = dependency_alerts(&ranking, &graph());

        let pairs: Vec<(&str, &str)> = alerts
            .iter()
            .map(|a| (a.symptom_topic.as_str(), a.root_cause_topic.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Integration", "Differentiation"), ("Differentiation", "Functions")]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(dependency_alerts(&[], &graph()).is_empty());
        assert!(dependency_alerts(&[stat("Integration", 2)], &TopicDependencyGraph::new()).is_empty());
    }
}
