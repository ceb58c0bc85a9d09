use crate::{FailureKind, Stage};

/// Hooks into stage execution. All methods default to no-ops.
pub trait Observer: Send + Sync {
    fn on_stage_enter(&self, _session_id: &str, _stage: Stage) {}
    fn on_stage_exit(&self, _session_id: &str, _stage: Stage) {}
    fn on_failure(&self, _session_id: &str, _kind: FailureKind, _message: &str) {}
    fn on_checkpoint_saved(&self, _session_id: &str, _stage: Stage) {}
}
