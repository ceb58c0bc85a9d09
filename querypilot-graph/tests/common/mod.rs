#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use querypilot_core::{
    ActionTag, AnswerRequest, CandidateValue, ColumnInfo, ColumnMatch, ColumnScorer, JoinPath,
    LanguageModel, Plan, PlanRequest, QueryPilotError, SqlExecutor, SqlRequest, TabularResult,
    ValueMatch, ValueScorer,
};
use querypilot_graph::{
    Checkpointer, Observer, SqlWorkflow, SqlWorkflowBuilder, Stage, WorkflowConfig,
};
use querypilot_join::{SchemaGraph, SchemaMetadata};

pub const SOCCER_SCHEMA: &str = r#"{
    "tables": [
        {"name": "Country", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "name", "type": "TEXT", "sample_values": ["Spain", "England"]}
        ]},
        {"name": "Team", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "team_long_name", "type": "TEXT", "sample_values": ["FC Barcelona"]}
        ]},
        {"name": "Player", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "player_name", "type": "TEXT", "sample_values": ["Lionel Messi"]},
            {"name": "team_id", "type": "INTEGER"}
        ]},
        {"name": "Match", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "country_id", "type": "INTEGER"},
            {"name": "home_team_id", "type": "INTEGER"},
            {"name": "home_team_goal", "type": "INTEGER"}
        ]}
    ],
    "foreign_keys": [
        {"from_table": "Match", "from_column": "country_id", "to_table": "Country", "to_column": "id"},
        {"from_table": "Match", "from_column": "home_team_id", "to_table": "Team", "to_column": "id"},
        {"from_table": "Player", "from_column": "team_id", "to_table": "Team", "to_column": "id"}
    ]
}"#;

pub fn soccer_graph() -> Arc<SchemaGraph> {
    let metadata = SchemaMetadata::from_json_str(SOCCER_SCHEMA).unwrap();
    Arc::new(SchemaGraph::from_metadata(metadata).unwrap())
}

pub fn column(table: &str, name: &str) -> ColumnMatch {
    ColumnMatch {
        table: table.to_string(),
        column: name.to_string(),
        data_type: "TEXT".to_string(),
        score: 0.8,
    }
}

pub fn player_columns() -> Vec<ColumnMatch> {
    vec![
        column("Player", "id"),
        column("Player", "player_name"),
        column("Player", "team_id"),
    ]
}

/// What the model saw on one SQL generation call.
#[derive(Clone, Debug)]
pub struct SqlCall {
    pub last_error: Option<String>,
    pub human_feedback: Option<String>,
    pub join_paths: Vec<JoinPath>,
    pub prior_attempts: usize,
    pub guidance: Vec<String>,
}

pub struct ScriptedModel {
    plans: Mutex<VecDeque<Result<Plan, QueryPilotError>>>,
    default_plan: Plan,
    sql: Mutex<VecDeque<Result<String, QueryPilotError>>>,
    default_sql: String,
    pub plan_guidance: Mutex<Vec<Vec<String>>>,
    pub sql_calls: Mutex<Vec<SqlCall>>,
    pub answered_rows: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    pub fn new(plan: &str, actions: &[ActionTag]) -> Self {
        Self {
            plans: Mutex::new(VecDeque::new()),
            default_plan: Plan {
                plan: plan.to_string(),
                required_actions: actions.to_vec(),
            },
            sql: Mutex::new(VecDeque::new()),
            default_sql: "SELECT COUNT(*) FROM Player".to_string(),
            plan_guidance: Mutex::new(Vec::new()),
            sql_calls: Mutex::new(Vec::new()),
            answered_rows: Mutex::new(Vec::new()),
        }
    }

    pub fn with_plan_results(self, plans: Vec<Result<Plan, QueryPilotError>>) -> Self {
        *self.plans.lock().unwrap() = plans.into();
        self
    }

    pub fn with_sql(self, sql: Vec<Result<String, QueryPilotError>>) -> Self {
        *self.sql.lock().unwrap() = sql.into();
        self
    }

    pub fn with_default_sql(mut self, sql: &str) -> Self {
        self.default_sql = sql.to_string();
        self
    }

    pub fn sql_calls(&self) -> Vec<SqlCall> {
        self.sql_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_plan(&self, request: &PlanRequest<'_>) -> Result<Plan, QueryPilotError> {
        self.plan_guidance
            .lock()
            .unwrap()
            .push(request.guidance.to_vec());
        self.plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_plan.clone()))
    }

    async fn generate_sql(&self, request: &SqlRequest<'_>) -> Result<String, QueryPilotError> {
        self.sql_calls.lock().unwrap().push(SqlCall {
            last_error: request.last_error.map(str::to_string),
            human_feedback: request.human_feedback.map(str::to_string),
            join_paths: request.join_paths.to_vec(),
            prior_attempts: request.prior_attempts.len(),
            guidance: request.guidance.to_vec(),
        });
        self.sql
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("```sql\n{}\n```", self.default_sql)))
    }

    async fn generate_answer(
        &self,
        request: &AnswerRequest<'_>,
    ) -> Result<String, QueryPilotError> {
        self.answered_rows
            .lock()
            .unwrap()
            .push(request.result.row_count());
        Ok(format!("Answer from {} row(s)", request.result.row_count()))
    }
}

/// Returns the same matches for every query.
pub struct FixedColumnScorer(pub Vec<ColumnMatch>);

#[async_trait]
impl ColumnScorer for FixedColumnScorer {
    async fn search_columns(
        &self,
        _query: &str,
        _candidates: &[ColumnInfo],
        top_k: usize,
    ) -> Result<Vec<ColumnMatch>, QueryPilotError> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }
}

pub struct FailingColumnScorer;

#[async_trait]
impl ColumnScorer for FailingColumnScorer {
    async fn search_columns(
        &self,
        _query: &str,
        _candidates: &[ColumnInfo],
        _top_k: usize,
    ) -> Result<Vec<ColumnMatch>, QueryPilotError> {
        Err(QueryPilotError::ScorerFailed {
            scorer: "embeddings".to_string(),
            reason: "index unavailable".to_string(),
        })
    }
}

/// Matches stored values that occur in the query text.
pub struct SubstringValueScorer;

#[async_trait]
impl ValueScorer for SubstringValueScorer {
    async fn search_values(
        &self,
        query: &str,
        candidates: &[CandidateValue],
        top_k: usize,
    ) -> Result<Vec<ValueMatch>, QueryPilotError> {
        let query = query.to_lowercase();
        Ok(candidates
            .iter()
            .filter(|candidate| query.contains(&candidate.value.to_lowercase()))
            .take(top_k)
            .map(|candidate| ValueMatch {
                table: candidate.table.clone(),
                column: candidate.column.clone(),
                value: candidate.value.clone(),
                score: 1.0,
            })
            .collect())
    }
}

pub struct ScriptedExecutor {
    results: Mutex<VecDeque<Result<TabularResult, QueryPilotError>>>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<Result<TabularResult, QueryPilotError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn always_failing(message: &str, times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Err(QueryPilotError::Execution(message.to_string())))
                .collect(),
        )
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str) -> Result<TabularResult, QueryPilotError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TabularResult::new(
                    vec!["count".to_string()],
                    vec![vec![serde_json::json!(42)]],
                ))
            })
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub entered: Mutex<Vec<Stage>>,
    pub checkpoints: Mutex<Vec<Stage>>,
    pub failures: Mutex<Vec<String>>,
}

impl Observer for RecordingObserver {
    fn on_stage_enter(&self, _session_id: &str, stage: Stage) {
        self.entered.lock().unwrap().push(stage);
    }

    fn on_checkpoint_saved(&self, _session_id: &str, stage: Stage) {
        self.checkpoints.lock().unwrap().push(stage);
    }

    fn on_failure(&self, _session_id: &str, _kind: querypilot_graph::FailureKind, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub executor: Arc<ScriptedExecutor>,
    pub columns: Vec<ColumnMatch>,
    pub config: WorkflowConfig,
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    pub observer: Option<Arc<dyn Observer>>,
}

impl Harness {
    pub fn new(model: ScriptedModel, executor: ScriptedExecutor) -> Self {
        Self {
            model: Arc::new(model),
            executor: Arc::new(executor),
            columns: player_columns(),
            config: WorkflowConfig::default(),
            checkpointer: None,
            observer: None,
        }
    }

    pub fn columns(mut self, columns: Vec<ColumnMatch>) -> Self {
        self.columns = columns;
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn builder(&self) -> SqlWorkflowBuilder {
        let mut builder = SqlWorkflow::builder()
            .config(self.config.clone())
            .language_model(self.model.clone())
            .column_scorer(Arc::new(FixedColumnScorer(self.columns.clone())))
            .value_scorer(Arc::new(SubstringValueScorer))
            .executor(self.executor.clone())
            .schema(soccer_graph());
        if let Some(checkpointer) = &self.checkpointer {
            builder = builder.checkpointer(checkpointer.clone());
        }
        if let Some(observer) = &self.observer {
            builder = builder.observer(observer.clone());
        }
        builder
    }

    pub fn workflow(&self) -> SqlWorkflow {
        self.builder().build().unwrap()
    }
}

pub fn human_config(max_iterations: usize) -> WorkflowConfig {
    WorkflowConfig {
        max_iterations,
        enable_human_interaction: true,
        ..WorkflowConfig::default()
    }
}
