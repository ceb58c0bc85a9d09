use std::sync::Arc;

use querypilot_core::{
    ColumnScorer, JoinPath, LanguageModel, PriorTurn, SqlExecutor, ValueScorer,
};
use querypilot_join::{ErrorClassifier, JoinNecessityClassifier, PathResolver, SchemaGraph};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::routing::{route, Transition};
use crate::{
    Checkpoint, Checkpointer, ConfirmationType, FailureKind, FailureReport, HumanResponse,
    InMemoryCheckpointer, Interrupt, Observer, SessionState, Stage, StepRecord, WorkflowConfig,
    WorkflowError, WorkflowOptions,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    Completed,
    Paused(Interrupt),
    Failed,
}

/// What a caller gets back from one run or resume call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub session_id: String,
    pub status: TurnStatus,
    pub final_answer: Option<String>,
    pub sql_history: Vec<String>,
    pub join_paths: Vec<JoinPath>,
    pub selected_path_indices: Vec<usize>,
    pub intermediate_steps: Vec<StepRecord>,
    pub iteration: usize,
    pub failure: Option<FailureReport>,
}

impl TurnResult {
    fn from_state(state: SessionState, status: TurnStatus) -> Self {
        Self {
            session_id: state.session_id,
            status,
            final_answer: state.final_answer,
            sql_history: state.sql_history,
            join_paths: state.join_paths,
            selected_path_indices: state.selected_path_indices.into_iter().collect(),
            intermediate_steps: state.steps,
            iteration: state.iteration,
            failure: state.failure,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, TurnStatus::Paused(_))
    }

    pub fn interrupt(&self) -> Option<&Interrupt> {
        match &self.status {
            TurnStatus::Paused(interrupt) => Some(interrupt),
            _ => None,
        }
    }

    pub fn last_sql(&self) -> Option<&str> {
        self.sql_history.last().map(String::as_str)
    }
}

/// Orchestrates one question at a time through planning, search, join
/// resolution, SQL generation, execution and answering.
pub struct SqlWorkflow {
    pub(crate) config: WorkflowConfig,
    pub(crate) language: Arc<dyn LanguageModel>,
    pub(crate) column_scorer: Option<Arc<dyn ColumnScorer>>,
    pub(crate) value_scorer: Option<Arc<dyn ValueScorer>>,
    pub(crate) executor: Arc<dyn SqlExecutor>,
    pub(crate) schema: Arc<SchemaGraph>,
    pub(crate) schema_summary: String,
    pub(crate) resolver: PathResolver,
    pub(crate) necessity: JoinNecessityClassifier,
    pub(crate) classifier: ErrorClassifier,
    checkpointer: Arc<dyn Checkpointer>,
    observer: Option<Arc<dyn Observer>>,
}

impl SqlWorkflow {
    pub fn builder() -> SqlWorkflowBuilder {
        SqlWorkflowBuilder::default()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn schema_summary(&self) -> &str {
        &self.schema_summary
    }

    pub async fn run_turn(&self, question: &str, prior_turns: &[PriorTurn]) -> TurnResult {
        self.start(question, prior_turns, None).await
    }

    pub async fn run_turn_with_cancellation(
        &self,
        question: &str,
        prior_turns: &[PriorTurn],
        cancellation: &CancellationToken,
    ) -> TurnResult {
        self.start(question, prior_turns, Some(cancellation)).await
    }

    /// Continues a paused session with the human's response.
    pub async fn resume_turn(
        &self,
        session_id: &str,
        response: impl Into<HumanResponse>,
    ) -> Result<TurnResult, WorkflowError> {
        self.resume(session_id, response.into(), None).await
    }

    pub async fn resume_turn_with_cancellation(
        &self,
        session_id: &str,
        response: impl Into<HumanResponse>,
        cancellation: &CancellationToken,
    ) -> Result<TurnResult, WorkflowError> {
        self.resume(session_id, response.into(), Some(cancellation))
            .await
    }

    async fn start(
        &self,
        question: &str,
        prior_turns: &[PriorTurn],
        cancellation: Option<&CancellationToken>,
    ) -> TurnResult {
        let state = SessionState::new(
            question,
            self.schema_summary.clone(),
            self.config.max_iterations,
        )
        .with_prior_turns(prior_turns.to_vec());
        tracing::info!(session_id = %state.session_id, question = %question, "starting turn");
        self.drive(state, Stage::Planning, cancellation).await
    }

    async fn resume(
        &self,
        session_id: &str,
        response: HumanResponse,
        cancellation: Option<&CancellationToken>,
    ) -> Result<TurnResult, WorkflowError> {
        let checkpoint = self
            .checkpointer
            .load(session_id)
            .await?
            .ok_or_else(|| WorkflowError::UnknownSession(session_id.to_string()))?;
        let mut state = checkpoint.state;
        if !state.awaiting_confirmation {
            return Err(WorkflowError::NotAwaitingInput(session_id.to_string()));
        }
        tracing::info!(
            session_id = %session_id,
            stage = %checkpoint.stage,
            "resuming turn with human response"
        );
        state.human_response = Some(response);
        Ok(self.drive(state, checkpoint.stage, cancellation).await)
    }

    async fn drive(
        &self,
        mut state: SessionState,
        mut stage: Stage,
        cancellation: Option<&CancellationToken>,
    ) -> TurnResult {
        let mut steps = 0usize;
        while stage != Stage::End {
            if cancellation.is_some_and(CancellationToken::is_cancelled) {
                tracing::warn!(session_id = %state.session_id, stage = %stage, "turn cancelled");
                state.fail(
                    FailureKind::Cancelled,
                    "The request was cancelled before an answer was produced.",
                );
                break;
            }
            steps += 1;
            if steps > self.config.max_steps {
                tracing::warn!(
                    session_id = %state.session_id,
                    max_steps = self.config.max_steps,
                    "step limit exceeded"
                );
                state.fail(
                    FailureKind::StepLimitExceeded,
                    "The request took too many steps to complete.",
                );
                break;
            }

            if let Some(observer) = &self.observer {
                observer.on_stage_enter(&state.session_id, stage);
            }
            self.run_stage(stage, &mut state).await;
            if let Some(observer) = &self.observer {
                observer.on_stage_exit(&state.session_id, stage);
            }

            let transition = route(stage, &state, &self.config);
            tracing::debug!(
                session_id = %state.session_id,
                from = %stage,
                to = %transition.target(),
                "transition"
            );
            match transition {
                Transition::Next(next) => stage = next,
                Transition::Retry => {
                    state.iteration += 1;
                    stage = Stage::GenerateSql;
                }
                Transition::Confirm(kind) => {
                    state.awaiting_confirmation = true;
                    state.confirmation_type = Some(kind);
                    if kind == ConfirmationType::Error {
                        state.human_escalated = true;
                    }
                    stage = Stage::HumanInteraction;
                }
                Transition::Suspend => return self.suspend(state, stage).await,
                Transition::Finish => stage = Stage::End,
            }
        }
        self.finish(state).await
    }

    async fn run_stage(&self, stage: Stage, state: &mut SessionState) {
        match stage {
            Stage::Planning => self.planning(state).await,
            Stage::SearchColumns => self.search_columns(state).await,
            Stage::SearchValues => self.search_values(state).await,
            Stage::FindPaths => self.find_paths(state),
            Stage::GenerateSql => self.generate_sql(state).await,
            Stage::ExecuteSql => self.execute_sql(state).await,
            Stage::Answer => self.answer(state).await,
            Stage::HumanInteraction => self.human_interaction(state),
            Stage::End => {}
        }
    }

    async fn suspend(&self, mut state: SessionState, stage: Stage) -> TurnResult {
        let confirmation = state
            .confirmation_type
            .unwrap_or(ConfirmationType::Error);
        let checkpoint = Checkpoint::new(stage, state.clone());
        if let Err(err) = self.checkpointer.save(&checkpoint).await {
            tracing::error!(session_id = %state.session_id, error = %err, "failed to persist paused session");
            state.awaiting_confirmation = false;
            state.fail(
                FailureKind::CheckpointFailure,
                format!("The request needed confirmation but could not be paused: {err}"),
            );
            return self.finish(state).await;
        }
        if let Some(observer) = &self.observer {
            observer.on_checkpoint_saved(&state.session_id, stage);
        }

        let interrupt = Interrupt {
            session_id: state.session_id.clone(),
            confirmation,
            prompt: confirmation_prompt(confirmation, &state),
        };
        tracing::info!(
            session_id = %state.session_id,
            confirmation = ?confirmation,
            "turn paused for human input"
        );
        TurnResult::from_state(state, TurnStatus::Paused(interrupt))
    }

    async fn finish(&self, mut state: SessionState) -> TurnResult {
        if state.final_answer.is_none() {
            match state.execution_error.clone() {
                Some(error) => state.fail(
                    FailureKind::IterationExhausted,
                    format!(
                        "I wasn't able to produce a working query after {} attempt(s). \
                         The last error was: {error}",
                        state.iteration
                    ),
                ),
                None => state.fail(
                    FailureKind::GenerationFailure,
                    "I wasn't able to produce an answer for this question.",
                ),
            }
        }
        if let Some(failure) = &state.failure {
            tracing::warn!(
                session_id = %state.session_id,
                kind = ?failure.kind,
                "turn ended with failure: {}",
                failure.message
            );
            if let Some(observer) = &self.observer {
                observer.on_failure(&state.session_id, failure.kind, &failure.message);
            }
        }
        if let Err(err) = self.checkpointer.discard(&state.session_id).await {
            tracing::warn!(session_id = %state.session_id, error = %err, "failed to discard checkpoint");
        }

        let status = if state.failure.is_some() {
            TurnStatus::Failed
        } else {
            TurnStatus::Completed
        };
        tracing::info!(
            session_id = %state.session_id,
            iterations = state.iteration,
            status = ?status,
            "turn finished"
        );
        TurnResult::from_state(state, status)
    }
}

fn confirmation_prompt(confirmation: ConfirmationType, state: &SessionState) -> String {
    match confirmation {
        ConfirmationType::Plan => format!(
            "Proposed plan:\n{}\n\nApprove the plan, or describe what to change.",
            state.plan
        ),
        ConfirmationType::Sql => format!(
            "Proposed SQL:\n{}\n\nApprove the query, or describe what to change.",
            state.sql_query
        ),
        ConfirmationType::Error => format!(
            "The query failed after {} attempt(s):\n{}\n\nError: {}\n\n\
             Describe how to fix it, or reply 'approve' to let me try once more.",
            state.iteration,
            state.sql_query,
            state.execution_error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[derive(Default)]
pub struct SqlWorkflowBuilder {
    config: WorkflowConfig,
    language: Option<Arc<dyn LanguageModel>>,
    column_scorer: Option<Arc<dyn ColumnScorer>>,
    value_scorer: Option<Arc<dyn ValueScorer>>,
    executor: Option<Arc<dyn SqlExecutor>>,
    schema: Option<Arc<SchemaGraph>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    observer: Option<Arc<dyn Observer>>,
}

impl SqlWorkflowBuilder {
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(mut self, options: WorkflowOptions) -> Self {
        self.config = self.config.merge(&options);
        self
    }

    pub fn language_model(mut self, language: Arc<dyn LanguageModel>) -> Self {
        self.language = Some(language);
        self
    }

    pub fn column_scorer(mut self, scorer: Arc<dyn ColumnScorer>) -> Self {
        self.column_scorer = Some(scorer);
        self
    }

    pub fn value_scorer(mut self, scorer: Arc<dyn ValueScorer>) -> Self {
        self.value_scorer = Some(scorer);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn schema(mut self, schema: Arc<SchemaGraph>) -> Self {
        self.schema = Some(schema);
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

    pub fn build(self) -> Result<SqlWorkflow, WorkflowError> {
        self.config.validate()?;
        let language = self
            .language
            .ok_or(WorkflowError::MissingComponent("language model"))?;
        let executor = self
            .executor
            .ok_or(WorkflowError::MissingComponent("sql executor"))?;
        let schema = self
            .schema
            .ok_or(WorkflowError::MissingComponent("schema graph"))?;
        if self.column_scorer.is_none() {
            tracing::warn!("no column scorer configured; column search falls back to schema enumeration");
        }

        Ok(SqlWorkflow {
            schema_summary: schema.metadata().summary(),
            resolver: PathResolver::new(schema.clone()),
            necessity: JoinNecessityClassifier::new(),
            classifier: ErrorClassifier::new(),
            config: self.config,
            language,
            column_scorer: self.column_scorer,
            value_scorer: self.value_scorer,
            executor,
            schema,
            checkpointer: self
                .checkpointer
                .unwrap_or_else(|| Arc::new(InMemoryCheckpointer::default())),
            observer: self.observer,
        })
    }
}
