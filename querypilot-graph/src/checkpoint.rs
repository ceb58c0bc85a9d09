use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::{SessionState, Stage, WorkflowError};

/// A paused session: the full state plus the stage to re-enter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub session_id: String,
    pub stage: Stage,
    pub state: SessionState,
    pub created_at: String,
}

impl Checkpoint {
    pub fn new(stage: Stage, state: SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            stage,
            state,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait::async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError>;
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, WorkflowError>;
    /// Drops everything stored for a finished session.
    async fn discard(&self, session_id: &str) -> Result<(), WorkflowError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub seq: u64,
    pub stage: Stage,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait HistoryCheckpointer: Send + Sync {
    async fn list_checkpoints(
        &self,
        session_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, WorkflowError>;
}

#[derive(Default, Clone)]
pub struct InMemoryCheckpointer {
    inner: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.inner.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| WorkflowError::Checkpoint("lock".into()))?;
        guard
            .entry(checkpoint.session_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, WorkflowError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| WorkflowError::Checkpoint("lock".into()))?;
        Ok(guard
            .get(session_id)
            .and_then(|history| history.last())
            .cloned())
    }

    async fn discard(&self, session_id: &str) -> Result<(), WorkflowError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| WorkflowError::Checkpoint("lock".into()))?;
        guard.remove(session_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryCheckpointer for InMemoryCheckpointer {
    async fn list_checkpoints(
        &self,
        session_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, WorkflowError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| WorkflowError::Checkpoint("lock".into()))?;
        Ok(guard
            .get(session_id)
            .map(|history| {
                history
                    .iter()
                    .enumerate()
                    .map(|(index, checkpoint)| CheckpointMetadata {
                        seq: index as u64 + 1,
                        stage: checkpoint.stage,
                        created_at: checkpoint.created_at.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
