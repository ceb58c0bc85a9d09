use querypilot_core::QueryPilotError;
use serde::{Deserialize, Serialize};

/// Immutable per-orchestrator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_iterations: usize,
    pub enable_human_interaction: bool,
    /// Pause for approval after planning.
    pub confirm_plan: bool,
    /// Pause for approval after each SQL generation.
    pub confirm_sql: bool,
    pub column_fallback_threshold: usize,
    pub column_fallback_cap: usize,
    pub column_top_k: usize,
    pub value_top_k: usize,
    pub max_value_terms: usize,
    pub result_row_limit: usize,
    /// Upper bound on stage transitions per run or resume call.
    pub max_steps: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            enable_human_interaction: false,
            confirm_plan: false,
            confirm_sql: false,
            column_fallback_threshold: 3,
            column_fallback_cap: 50,
            column_top_k: 5,
            value_top_k: 5,
            max_value_terms: 3,
            result_row_limit: 100,
            max_steps: 50,
        }
    }
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<(), QueryPilotError> {
        if self.max_iterations == 0 {
            return Err(QueryPilotError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if (self.confirm_plan || self.confirm_sql) && !self.enable_human_interaction {
            return Err(QueryPilotError::InvalidConfig(
                "confirmation checkpoints require enable_human_interaction".to_string(),
            ));
        }
        if self.column_fallback_cap < self.column_fallback_threshold {
            return Err(QueryPilotError::InvalidConfig(format!(
                "column_fallback_cap ({}) is below column_fallback_threshold ({})",
                self.column_fallback_cap, self.column_fallback_threshold
            )));
        }
        if self.max_steps == 0 {
            return Err(QueryPilotError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn merge(&self, overrides: &WorkflowOptions) -> Self {
        Self {
            max_iterations: overrides.max_iterations.unwrap_or(self.max_iterations),
            enable_human_interaction: overrides
                .enable_human_interaction
                .unwrap_or(self.enable_human_interaction),
            confirm_plan: overrides.confirm_plan.unwrap_or(self.confirm_plan),
            confirm_sql: overrides.confirm_sql.unwrap_or(self.confirm_sql),
            column_fallback_threshold: overrides
                .column_fallback_threshold
                .unwrap_or(self.column_fallback_threshold),
            column_fallback_cap: overrides
                .column_fallback_cap
                .unwrap_or(self.column_fallback_cap),
            max_steps: overrides.max_steps.unwrap_or(self.max_steps),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WorkflowOptions {
    pub max_iterations: Option<usize>,
    pub enable_human_interaction: Option<bool>,
    pub confirm_plan: Option<bool>,
    pub confirm_sql: Option<bool>,
    pub column_fallback_threshold: Option<usize>,
    pub column_fallback_cap: Option<usize>,
    pub max_steps: Option<usize>,
}
