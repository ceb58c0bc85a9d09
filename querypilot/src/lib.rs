//! Natural-language to SQL orchestration with schema-aware join resolution.
//!
//! `querypilot-core` holds the shared data model and collaborator traits,
//! `querypilot-join` the schema graph and path resolver, and
//! `querypilot-graph` (feature `workflow`) the resumable orchestrator.

pub use querypilot_core as core;
pub use querypilot_join as join;

#[cfg(feature = "workflow")]
pub use querypilot_graph as workflow;

pub mod prelude {
    pub use querypilot_core::{
        ColumnScorer, JoinPath, LanguageModel, QueryPilotError, SqlExecutor, TabularResult,
        ValueScorer,
    };
    pub use querypilot_join::{PathResolver, SchemaGraph, SchemaMetadata};

    #[cfg(feature = "workflow")]
    pub use querypilot_graph::{
        HumanResponse, SqlWorkflow, TurnResult, TurnStatus, WorkflowConfig,
    };
}
