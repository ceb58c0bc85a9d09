mod error;
mod error_classifier;
mod graph;
mod necessity;
mod resolver;
mod schema;

pub use error::JoinError;
pub use error_classifier::{ErrorClassifier, ErrorKind};
pub use graph::SchemaGraph;
pub use necessity::{JoinDecision, JoinIndicators, JoinNecessityClassifier};
pub use resolver::{PathResolution, PathResolver};
pub use schema::{ColumnMeta, SchemaMetadata, TableMeta};
