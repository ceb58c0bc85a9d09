use async_trait::async_trait;

use crate::{CandidateValue, ColumnInfo, ColumnMatch, QueryPilotError, TabularResult, ValueMatch};

/// Semantic column ranking, typically backed by embeddings.
#[async_trait]
pub trait ColumnScorer: Send + Sync {
    async fn search_columns(
        &self,
        query: &str,
        candidates: &[ColumnInfo],
        top_k: usize,
    ) -> Result<Vec<ColumnMatch>, QueryPilotError>;
}

/// Lexical value ranking, typically BM25 over stored cell values.
#[async_trait]
pub trait ValueScorer: Send + Sync {
    async fn search_values(
        &self,
        query: &str,
        candidates: &[CandidateValue],
        top_k: usize,
    ) -> Result<Vec<ValueMatch>, QueryPilotError>;
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Runs `sql`; failures carry the database message in
    /// [`QueryPilotError::Execution`].
    async fn execute(&self, sql: &str) -> Result<TabularResult, QueryPilotError>;
}
