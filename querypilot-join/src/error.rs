use thiserror::Error;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("duplicate table '{0}' in schema metadata")]
    DuplicateTable(String),
    #[error("foreign key {key} references unknown table '{table}'")]
    UnknownTable { table: String, key: String },
    #[error("failed to read schema metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid schema metadata: {0}")]
    Json(#[from] serde_json::Error),
}
