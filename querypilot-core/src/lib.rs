mod error;
mod llm;
mod model;
mod output_parsers;
mod scoring;

pub use error::QueryPilotError;
pub use llm::{
    ActionTag, AnswerRequest, LanguageModel, Plan, PlanRequest, PriorTurn, SqlRequest,
};
pub use model::{
    CandidateValue, ColumnInfo, ColumnMatch, ForeignKey, JoinPath, KeyKind, PathRank,
    TabularResult, ValueMatch,
};
pub use output_parsers::{clean_sql, parse_plan};
pub use scoring::{ColumnScorer, SqlExecutor, ValueScorer};
