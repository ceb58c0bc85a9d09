use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use querypilot_join::{
    ErrorClassifier, JoinNecessityClassifier, PathResolver, SchemaGraph, SchemaMetadata,
};
use serde_json::json;

pub fn load_graph(path: Option<&Path>) -> Result<Arc<SchemaGraph>> {
    let path = path.context("a schema file is required (--schema or QUERYPILOT_SCHEMA)")?;
    let metadata = SchemaMetadata::from_path(path)
        .with_context(|| format!("failed to read schema from {}", path.display()))?;
    let graph = SchemaGraph::from_metadata(metadata)
        .with_context(|| format!("invalid schema in {}", path.display()))?;
    tracing::info!(
        tables = graph.table_count(),
        foreign_keys = graph.edge_count(),
        "schema loaded"
    );
    Ok(Arc::new(graph))
}

pub fn schema(graph: &SchemaGraph, as_json: bool) -> Result<String> {
    if as_json {
        return Ok(serde_json::to_string_pretty(graph.metadata())?);
    }
    Ok(graph.metadata().summary())
}

pub fn paths(graph: Arc<SchemaGraph>, tables: &[String], as_json: bool) -> Result<String> {
    let resolution = PathResolver::new(graph).resolve(tables);
    if as_json {
        return Ok(serde_json::to_string_pretty(&resolution)?);
    }

    let mut out = String::new();
    if resolution.paths.is_empty() {
        out.push_str("No join paths found.\n");
    }
    for (index, path) in resolution.paths.iter().enumerate() {
        writeln!(
            out,
            "[{index}] {path} (hops: {}, penalty: {})",
            path.rank_score.hops, path.rank_score.penalty
        )?;
        writeln!(out, "    {}", path.join_clause())?;
    }
    for (left, right) in &resolution.unconnected {
        writeln!(out, "unconnected: {left} / {right}")?;
    }
    if !resolution.unknown.is_empty() {
        writeln!(out, "unknown tables: {}", resolution.unknown.join(", "))?;
    }
    Ok(out.trim_end().to_string())
}

pub fn classify_error(
    graph: Option<Arc<SchemaGraph>>,
    message: &str,
    as_json: bool,
) -> Result<String> {
    let classifier = ErrorClassifier::new();
    let kind = classifier.classify(message);
    let identifiers = classifier.referenced_identifiers(message);
    let tables: Vec<String> = graph
        .map(|graph| {
            PathResolver::new(graph)
                .tables_from_error(message)
                .into_iter()
                .collect()
        })
        .unwrap_or_default();

    if as_json {
        return Ok(serde_json::to_string_pretty(&json!({
            "kind": kind,
            "identifiers": identifiers,
            "tables": tables,
        }))?);
    }
    let mut out = format!("kind: {kind:?}");
    if !identifiers.is_empty() {
        write!(out, "\nidentifiers: {}", identifiers.join(", "))?;
    }
    if !tables.is_empty() {
        write!(out, "\ntables: {}", tables.join(", "))?;
    }
    Ok(out)
}

pub fn assess(
    question: &str,
    distinct_tables: usize,
    planner_requested: bool,
    as_json: bool,
) -> Result<String> {
    let decision =
        JoinNecessityClassifier::new().classify(question, distinct_tables, planner_requested);
    if as_json {
        return Ok(serde_json::to_string_pretty(&decision)?);
    }
    let verdict = if decision.needs_path_finding {
        "path finding required"
    } else if decision.path_finding_deferred {
        "path finding deferred to SQL generation"
    } else {
        "path finding skipped"
    };
    Ok(format!(
        "{verdict}\nindicators: relationship={} possessive={} temporal_spatial={}",
        decision.indicators.relationship,
        decision.indicators.possessive,
        decision.indicators.temporal_spatial
    ))
}
