//! Resumable workflow that turns a natural-language question into SQL,
//! executes it and answers from the result.

mod checkpoint;
mod config;
mod error;
mod file_checkpointer;
mod graph;
mod interrupt;
mod observer;
mod policy;
pub mod routing;
mod stages;
mod state;

pub use checkpoint::{
    Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, InMemoryCheckpointer,
};
pub use config::{WorkflowConfig, WorkflowOptions};
pub use error::WorkflowError;
pub use file_checkpointer::{CheckpointRecord, FileCheckpointer};
pub use graph::{SqlWorkflow, SqlWorkflowBuilder, TurnResult, TurnStatus};
pub use interrupt::{HumanResponse, Interrupt};
pub use observer::Observer;
pub use policy::{RetryDecision, RetryPolicy};
pub use routing::{route, Transition};
pub use state::{ConfirmationType, FailureKind, FailureReport, SessionState, Stage, StepRecord};
pub use tokio_util::sync::CancellationToken;
