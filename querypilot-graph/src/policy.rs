use crate::WorkflowConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Regenerate SQL with the error as context.
    Retry,
    /// Hand the failure to a human before the last attempt.
    Escalate,
    /// Give up and answer with a failure explanation.
    Terminate,
}

/// Decides what follows a failed execution. The iteration cap is absolute;
/// a human is consulted at most once, one attempt before the cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_iterations: usize,
    human_interaction: bool,
}

impl RetryPolicy {
    pub fn new(max_iterations: usize, human_interaction: bool) -> Self {
        Self {
            max_iterations,
            human_interaction,
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(config.max_iterations, config.enable_human_interaction)
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn decide(&self, iteration: usize, already_escalated: bool) -> RetryDecision {
        if self.human_interaction && !already_escalated && iteration + 1 == self.max_iterations {
            RetryDecision::Escalate
        } else if iteration < self.max_iterations {
            RetryDecision::Retry
        } else {
            RetryDecision::Terminate
        }
    }
}
