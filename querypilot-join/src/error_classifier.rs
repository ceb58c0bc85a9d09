//! Execution error classification.
//!
//! "no such column" counts as join related even when a plain schema mismatch
//! produced it, so fallback path finding may over-trigger.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    JoinRelated,
    SchemaMismatch,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::JoinRelated => write!(f, "JoinRelated"),
            ErrorKind::SchemaMismatch => write!(f, "SchemaMismatch"),
            ErrorKind::Other => write!(f, "Other"),
        }
    }
}

const JOIN_RELATED_MARKERS: &[&str] = &[
    "no such column",
    "ambiguous column",
    "unknown column",
    "table not found",
    "cross join",
    "cartesian product",
    "missing join",
    "foreign key",
];

const SCHEMA_MISMATCH_MARKERS: &[&str] = &[
    "no such table",
    "unknown table",
    "does not exist",
    "not found",
    "invalid column",
    "undefined column",
    "unknown identifier",
];

const IDENTIFIER_PATTERNS: &[&str] = &[
    r#"(?i)no such column:?\s*["'`]?([A-Za-z_][\w.]*)"#,
    r#"(?i)ambiguous column(?: name)?:?\s*["'`]?([A-Za-z_][\w.]*)"#,
    r#"(?i)unknown column:?\s*["'`]?([A-Za-z_][\w.]*)"#,
    r#"(?i)no such table:?\s*["'`]?([A-Za-z_][\w.]*)"#,
    r#"(?i)table\s+["'`]?([A-Za-z_][\w.]*)["'`]?\s+(?:not found|does not exist)"#,
    r#"(?i)column\s+["'`]?([A-Za-z_][\w.]*)["'`]?\s+(?:not found|does not exist)"#,
];

fn identifier_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        IDENTIFIER_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("identifier pattern is valid"))
            .collect()
    })
}

/// Stateless classifier for SQL execution error text.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error_text: &str) -> ErrorKind {
        let lowered = error_text.to_lowercase();
        if JOIN_RELATED_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return ErrorKind::JoinRelated;
        }
        if SCHEMA_MISMATCH_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return ErrorKind::SchemaMismatch;
        }
        ErrorKind::Other
    }

    /// Table or column identifiers named by the error, in order of appearance.
    /// Qualified names (`Team.name`) are kept whole.
    pub fn referenced_identifiers(&self, error_text: &str) -> Vec<String> {
        let mut hits: Vec<(usize, String)> = Vec::new();
        for pattern in identifier_patterns() {
            for captures in pattern.captures_iter(error_text) {
                if let Some(ident) = captures.get(1) {
                    let name = ident.as_str().trim_end_matches('.').to_string();
                    if !hits.iter().any(|(_, seen)| *seen == name) {
                        hits.push((ident.start(), name));
                    }
                }
            }
        }
        hits.sort_by_key(|(position, _)| *position);
        hits.into_iter().map(|(_, name)| name).collect()
    }
}
