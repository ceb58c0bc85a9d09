use querypilot_core::QueryPilotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("session {0} is not awaiting human input")]
    NotAwaitingInput(String),
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
    #[error(transparent)]
    Config(#[from] QueryPilotError),
}
