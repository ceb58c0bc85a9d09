use serde::{Deserialize, Serialize};

const RELATIONSHIP_PHRASES: &[&str] = &[
    "who played",
    "which team",
    "between",
    "along with",
    "played for",
    "belongs to",
    "associated with",
];

const POSSESSIVE_PHRASES: &[&str] = &["and their", "with their", "including their"];

const TEMPORAL_SPATIAL_PHRASES: &[&str] = &["during", "before", "after", "when", "where"];

/// Which keyword families fired for a question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinIndicators {
    pub relationship: bool,
    pub possessive: bool,
    pub temporal_spatial: bool,
}

impl JoinIndicators {
    pub fn scan(question: &str) -> Self {
        let normalized = normalize(question);
        Self {
            relationship: contains_any(&normalized, RELATIONSHIP_PHRASES),
            possessive: contains_any(&normalized, POSSESSIVE_PHRASES),
            temporal_spatial: contains_any(&normalized, TEMPORAL_SPATIAL_PHRASES),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDecision {
    pub needs_path_finding: bool,
    pub path_finding_deferred: bool,
    pub single_table_with_join_indicators: bool,
    pub indicators: JoinIndicators,
}

impl JoinDecision {
    pub fn skipped(&self) -> bool {
        !self.needs_path_finding && !self.path_finding_deferred
    }
}

/// Decides whether join resolution is required, deferred to SQL generation,
/// or skippable.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinNecessityClassifier;

impl JoinNecessityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(
        &self,
        question: &str,
        distinct_tables: usize,
        planning_requested: bool,
    ) -> JoinDecision {
        let indicators = JoinIndicators::scan(question);
        let skip = distinct_tables < 2
            && !planning_requested
            && !indicators.relationship
            && !indicators.possessive;

        let mut decision = JoinDecision {
            indicators,
            ..JoinDecision::default()
        };
        if skip {
            return decision;
        }
        if distinct_tables < 2 {
            decision.path_finding_deferred = true;
            decision.single_table_with_join_indicators = true;
        } else {
            decision.needs_path_finding = true;
        }
        decision
    }
}

fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases
        .iter()
        .any(|phrase| normalized.contains(&format!(" {phrase} ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_table_without_indicators_is_skipped() {
        let decision = JoinNecessityClassifier::new().classify("Show all players", 1, false);
        assert!(decision.skipped());
        assert!(!decision.single_table_with_join_indicators);
    }

    #[test]
    fn possessive_phrase_defers_with_one_table() {
        let decision =
            JoinNecessityClassifier::new().classify("Show me players and their teams", 1, false);
        assert!(decision.path_finding_deferred);
        assert!(decision.single_table_with_join_indicators);
        assert!(!decision.needs_path_finding);
        assert!(decision.indicators.possessive);
    }

    #[test]
    fn two_tables_need_path_finding() {
        let decision = JoinNecessityClassifier::new().classify("List goals", 2, false);
        assert!(decision.needs_path_finding);
        assert!(!decision.path_finding_deferred);
    }

    #[test]
    fn planner_request_with_one_table_defers() {
        let decision = JoinNecessityClassifier::new().classify("List goals", 1, true);
        assert!(decision.path_finding_deferred);
    }

    #[test]
    fn temporal_words_alone_do_not_force_joins() {
        let decision =
            JoinNecessityClassifier::new().classify("Goals scored during 2015", 1, false);
        assert!(decision.indicators.temporal_spatial);
        assert!(decision.skipped());
    }

    #[test]
    fn phrases_match_on_word_boundaries() {
        let indicators = JoinIndicators::scan("Show the betweenness and whenever values");
        assert!(!indicators.relationship);
        assert!(!indicators.temporal_spatial);
        let indicators = JoinIndicators::scan("Which team, along with its coach?");
        assert!(indicators.relationship);
    }
}
