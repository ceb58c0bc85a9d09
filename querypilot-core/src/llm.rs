use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ColumnMatch, JoinPath, QueryPilotError, TabularResult, ValueMatch};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    SearchColumn,
    SearchValue,
    FindShortestPath,
    GenerateSql,
    ExecuteSql,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::SearchColumn => "SearchColumn",
            ActionTag::SearchValue => "SearchValue",
            ActionTag::FindShortestPath => "FindShortestPath",
            ActionTag::GenerateSql => "GenerateSQL",
            ActionTag::ExecuteSql => "ExecuteSQL",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTag {
    type Err = QueryPilotError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "searchcolumn" | "searchcolumns" => Ok(ActionTag::SearchColumn),
            "searchvalue" | "searchvalues" => Ok(ActionTag::SearchValue),
            "findshortestpath" | "findpath" | "findpaths" => Ok(ActionTag::FindShortestPath),
            "generatesql" => Ok(ActionTag::GenerateSql),
            "executesql" => Ok(ActionTag::ExecuteSql),
            _ => Err(QueryPilotError::ParseFailed {
                output: raw.to_string(),
                reason: "unknown action".to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub plan: String,
    pub required_actions: Vec<ActionTag>,
}

impl Plan {
    pub fn requires(&self, action: ActionTag) -> bool {
        self.required_actions.contains(&action)
    }
}

/// A completed earlier turn of the same conversation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorTurn {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct PlanRequest<'a> {
    pub question: &'a str,
    pub schema_summary: &'a str,
    pub prior_turns: &'a [PriorTurn],
    pub guidance: &'a [String],
}

#[derive(Clone, Copy, Debug)]
pub struct SqlRequest<'a> {
    pub question: &'a str,
    pub schema_summary: &'a str,
    pub columns: &'a [ColumnMatch],
    pub values: &'a [ValueMatch],
    pub join_paths: &'a [JoinPath],
    pub prior_attempts: &'a [String],
    pub last_error: Option<&'a str>,
    pub human_feedback: Option<&'a str>,
    pub guidance: &'a [String],
    pub prior_turns: &'a [PriorTurn],
}

#[derive(Clone, Copy, Debug)]
pub struct AnswerRequest<'a> {
    pub question: &'a str,
    pub sql: &'a str,
    pub result: &'a TabularResult,
}

/// The external language-generation service.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate_plan(&self, request: &PlanRequest<'_>) -> Result<Plan, QueryPilotError>;

    async fn generate_sql(&self, request: &SqlRequest<'_>) -> Result<String, QueryPilotError>;

    async fn generate_answer(&self, request: &AnswerRequest<'_>)
        -> Result<String, QueryPilotError>;

    /// Semantic descriptions to feed the column scorer.
    async fn column_search_queries(
        &self,
        question: &str,
        _plan: &str,
    ) -> Result<Vec<String>, QueryPilotError> {
        Ok(vec![question.to_string()])
    }

    /// Entity names worth looking up in stored values.
    async fn value_search_terms(
        &self,
        question: &str,
        _plan: &str,
        _columns: &[ColumnMatch],
    ) -> Result<Vec<String>, QueryPilotError> {
        Ok(vec![question.to_string()])
    }
}
