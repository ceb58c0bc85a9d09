use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryPilotError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("Parsing failed on output '{output}': {reason}")]
    ParseFailed { output: String, reason: String },
    #[error("Scorer '{scorer}' failed: {reason}")]
    ScorerFailed { scorer: String, reason: String },
    #[error("{0}")]
    Execution(String),
    #[error("Checkpoint failed: {0}")]
    CheckpointFailed(String),
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl QueryPilotError {
    /// Text handed to error classification: the raw database message for
    /// execution failures, the display form for everything else.
    pub fn execution_text(&self) -> String {
        match self {
            QueryPilotError::Execution(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
