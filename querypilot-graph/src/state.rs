use std::collections::BTreeSet;
use std::fmt;

use querypilot_core::{
    ActionTag, ColumnMatch, JoinPath, PriorTurn, TabularResult, ValueMatch,
};
use serde::{Deserialize, Serialize};

use crate::HumanResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Planning,
    SearchColumns,
    SearchValues,
    FindPaths,
    GenerateSql,
    ExecuteSql,
    Answer,
    HumanInteraction,
    End,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planning => "PLANNING",
            Stage::SearchColumns => "SEARCH_COLUMNS",
            Stage::SearchValues => "SEARCH_VALUES",
            Stage::FindPaths => "FIND_PATHS",
            Stage::GenerateSql => "GENERATE_SQL",
            Stage::ExecuteSql => "EXECUTE_SQL",
            Stage::Answer => "ANSWER",
            Stage::HumanInteraction => "HUMAN_INTERACTION",
            Stage::End => "END",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationType {
    Plan,
    Sql,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PlanningFailure,
    SearchFailure,
    JoinUnresolved,
    ExecutionError,
    GenerationFailure,
    IterationExhausted,
    StepLimitExceeded,
    CheckpointFailure,
    Cancelled,
}

/// A labeled, user-facing explanation of why a turn did not produce a
/// normal answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
}

/// One entry of the intermediate-steps log returned with every turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub iteration: usize,
    pub message: String,
}

/// Everything one question's session knows. Created per question, owned by
/// the orchestrator, persisted only while waiting on a human.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub question: String,
    pub schema_summary: String,
    #[serde(default)]
    pub prior_turns: Vec<PriorTurn>,

    pub plan: String,
    pub required_actions: Vec<ActionTag>,

    pub relevant_columns: Vec<ColumnMatch>,
    pub relevant_values: Vec<ValueMatch>,
    pub join_paths: Vec<JoinPath>,
    pub selected_path_indices: BTreeSet<usize>,

    pub sql_query: String,
    pub sql_history: Vec<String>,

    pub execution_result: Option<TabularResult>,
    pub execution_error: Option<String>,

    /// 1-based number of the current generate/execute attempt.
    pub iteration: usize,
    pub max_iterations: usize,

    pub needs_column_search: bool,
    pub needs_value_search: bool,
    pub needs_path_finding: bool,
    pub ready_to_execute: bool,
    pub path_finding_deferred: bool,
    pub single_table_with_join_indicators: bool,
    pub path_finding_requested: bool,

    pub awaiting_confirmation: bool,
    pub confirmation_type: Option<ConfirmationType>,
    pub human_feedback: Option<String>,
    pub human_response: Option<HumanResponse>,
    pub human_escalated: bool,
    pub plan_approved: bool,
    pub sql_approved: bool,
    pub guidance: Vec<String>,

    pub generation_error: Option<String>,
    /// Execution error text already used for fallback path finding.
    pub fallback_error: Option<String>,

    pub final_answer: Option<String>,
    pub failure: Option<FailureReport>,
    pub steps: Vec<StepRecord>,
}

impl SessionState {
    pub fn new(
        question: impl Into<String>,
        schema_summary: impl Into<String>,
        max_iterations: usize,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            schema_summary: schema_summary.into(),
            prior_turns: Vec::new(),
            plan: String::new(),
            required_actions: Vec::new(),
            relevant_columns: Vec::new(),
            relevant_values: Vec::new(),
            join_paths: Vec::new(),
            selected_path_indices: BTreeSet::new(),
            sql_query: String::new(),
            sql_history: Vec::new(),
            execution_result: None,
            execution_error: None,
            iteration: 1,
            max_iterations,
            needs_column_search: false,
            needs_value_search: false,
            needs_path_finding: false,
            ready_to_execute: false,
            path_finding_deferred: false,
            single_table_with_join_indicators: false,
            path_finding_requested: false,
            awaiting_confirmation: false,
            confirmation_type: None,
            human_feedback: None,
            human_response: None,
            human_escalated: false,
            plan_approved: false,
            sql_approved: false,
            guidance: Vec::new(),
            generation_error: None,
            fallback_error: None,
            final_answer: None,
            failure: None,
            steps: Vec::new(),
        }
    }

    pub fn with_prior_turns(mut self, prior_turns: Vec<PriorTurn>) -> Self {
        self.prior_turns = prior_turns;
        self
    }

    /// Distinct tables among the relevant columns, sorted.
    pub fn distinct_tables(&self) -> BTreeSet<String> {
        self.relevant_columns
            .iter()
            .map(|column| column.table.clone())
            .collect()
    }

    pub fn record_step(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(
            session_id = %self.session_id,
            stage = %stage,
            iteration = self.iteration,
            "{message}"
        );
        self.steps.push(StepRecord {
            stage,
            iteration: self.iteration,
            message,
        });
    }

    /// Marks the turn failed with a user-visible explanation.
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        let message = message.into();
        self.final_answer = Some(message.clone());
        self.failure = Some(FailureReport { kind, message });
    }
}
