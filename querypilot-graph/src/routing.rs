//! Pure transition function of the workflow state machine.
//!
//! `route` reads the state a stage just produced and names the next stage.
//! It never mutates; the orchestrator applies the returned [`Transition`].

use crate::{ConfirmationType, RetryDecision, RetryPolicy, SessionState, Stage, WorkflowConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Next(Stage),
    /// Execution failed and another attempt is allowed: bump the iteration
    /// and go back to SQL generation.
    Retry,
    /// Pause at a human checkpoint of the given kind.
    Confirm(ConfirmationType),
    /// Still waiting on a human response; persist and return.
    Suspend,
    Finish,
}

impl Transition {
    pub fn target(&self) -> Stage {
        match self {
            Transition::Next(stage) => *stage,
            Transition::Retry => Stage::GenerateSql,
            Transition::Confirm(_) | Transition::Suspend => Stage::HumanInteraction,
            Transition::Finish => Stage::End,
        }
    }
}

pub fn route(stage: Stage, state: &SessionState, config: &WorkflowConfig) -> Transition {
    match stage {
        Stage::Planning => {
            if state.failure.is_some() {
                return Transition::Finish;
            }
            if config.confirm_plan && !state.plan_approved {
                return Transition::Confirm(ConfirmationType::Plan);
            }
            after_planning(state)
        }
        Stage::SearchColumns => {
            if state.needs_value_search {
                Transition::Next(Stage::SearchValues)
            } else {
                Transition::Next(Stage::FindPaths)
            }
        }
        Stage::SearchValues => {
            if state.needs_path_finding {
                Transition::Next(Stage::FindPaths)
            } else {
                Transition::Next(Stage::GenerateSql)
            }
        }
        Stage::FindPaths => Transition::Next(Stage::GenerateSql),
        Stage::GenerateSql => after_generation(state, config),
        Stage::ExecuteSql => after_execution(state, config),
        Stage::HumanInteraction => after_human(state, config),
        Stage::Answer | Stage::End => Transition::Finish,
    }
}

fn after_planning(state: &SessionState) -> Transition {
    if state.needs_column_search {
        Transition::Next(Stage::SearchColumns)
    } else {
        Transition::Next(Stage::SearchValues)
    }
}

fn after_generation(state: &SessionState, config: &WorkflowConfig) -> Transition {
    if !state.ready_to_execute {
        return Transition::Next(Stage::Answer);
    }
    if config.confirm_sql && !state.sql_approved {
        return Transition::Confirm(ConfirmationType::Sql);
    }
    Transition::Next(Stage::ExecuteSql)
}

/// A successful execution goes to ANSWER even when it returned no rows.
fn after_execution(state: &SessionState, config: &WorkflowConfig) -> Transition {
    if state.execution_error.is_none() {
        return Transition::Next(Stage::Answer);
    }
    match RetryPolicy::from_config(config).decide(state.iteration, state.human_escalated) {
        RetryDecision::Retry => Transition::Retry,
        RetryDecision::Escalate => Transition::Confirm(ConfirmationType::Error),
        RetryDecision::Terminate => Transition::Finish,
    }
}

fn after_human(state: &SessionState, config: &WorkflowConfig) -> Transition {
    if state.awaiting_confirmation {
        return Transition::Suspend;
    }
    match state.confirmation_type {
        Some(ConfirmationType::Plan) if state.plan_approved => after_planning(state),
        Some(ConfirmationType::Plan) => Transition::Next(Stage::Planning),
        Some(ConfirmationType::Sql) if state.sql_approved => after_generation(state, config),
        Some(ConfirmationType::Sql) => Transition::Next(Stage::GenerateSql),
        Some(ConfirmationType::Error) | None => {
            if state.iteration < config.max_iterations {
                Transition::Retry
            } else {
                Transition::Finish
            }
        }
    }
}
