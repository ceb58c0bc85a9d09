use std::collections::BTreeSet;
use std::sync::Arc;

use querypilot_core::{ColumnMatch, ForeignKey, JoinPath, ValueMatch};
use serde::{Deserialize, Serialize};

use crate::{ErrorClassifier, ErrorKind, SchemaGraph};

/// Output of a resolution request. Missing coverage is data, not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathResolution {
    /// Connected join paths, best ranked first.
    pub paths: Vec<JoinPath>,
    /// Table pairs with no foreign-key route between them.
    pub unconnected: Vec<(String, String)>,
    /// Requested names that are not schema tables.
    pub unknown: Vec<String>,
}

impl PathResolution {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn fully_connected(&self) -> bool {
        self.unconnected.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct PathResolver {
    graph: Arc<SchemaGraph>,
    classifier: ErrorClassifier,
}

impl PathResolver {
    pub fn new(graph: Arc<SchemaGraph>) -> Self {
        Self {
            graph,
            classifier: ErrorClassifier::new(),
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    /// Shortest path for every unordered pair of `tables`, merged into
    /// connected multi-table paths. Identical inputs give identical output.
    pub fn resolve<I, S>(&self, tables: I) -> PathResolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known = BTreeSet::new();
        let mut unknown = BTreeSet::new();
        for table in tables {
            let table = table.as_ref();
            match self.graph.canonical_table(table) {
                Some(canonical) => {
                    known.insert(canonical.to_string());
                }
                None => {
                    unknown.insert(table.to_string());
                }
            }
        }

        let known: Vec<String> = known.into_iter().collect();
        let mut pairwise = Vec::new();
        let mut unconnected = Vec::new();
        for (i, left) in known.iter().enumerate() {
            for right in &known[i + 1..] {
                match self.graph.shortest_path(left, right) {
                    Some(path) => pairwise.push(path),
                    None => {
                        tracing::debug!(from = %left, to = %right, "no join path between tables");
                        unconnected.push((left.clone(), right.clone()));
                    }
                }
            }
        }

        // stable: equal ranks keep discovery order
        pairwise.sort_by_key(|path| path.rank_score);
        let mut paths: Vec<JoinPath> = group_overlapping(pairwise)
            .into_iter()
            .map(merge_group)
            .collect();
        paths.sort_by_key(|path| path.rank_score);

        PathResolution {
            paths,
            unconnected,
            unknown: unknown.into_iter().collect(),
        }
    }

    /// Re-collects the table set once search results are more complete:
    /// tables of the matched columns and values, plus tables the question
    /// names outright.
    pub fn resolve_deferred(
        &self,
        columns: &[ColumnMatch],
        values: &[ValueMatch],
        question: &str,
    ) -> PathResolution {
        let mut tables = tables_of(columns);
        tables.extend(values.iter().map(|value| value.table.clone()));
        tables.extend(self.graph.metadata().tables_named_in(question));
        self.resolve(tables)
    }

    /// Fallback resolution driven by a failed execution. Returns `None`
    /// unless the error is join related and no paths are known yet.
    pub fn resolve_from_error(
        &self,
        columns: &[ColumnMatch],
        current_paths: &[JoinPath],
        error_text: &str,
    ) -> Option<PathResolution> {
        if !current_paths.is_empty() {
            return None;
        }
        if self.classifier.classify(error_text) != ErrorKind::JoinRelated {
            return None;
        }

        let mut tables = tables_of(columns);
        tables.extend(self.tables_from_error(error_text));
        Some(self.resolve(tables))
    }

    /// Candidate tables implied by identifiers in the error text.
    pub fn tables_from_error(&self, error_text: &str) -> BTreeSet<String> {
        let metadata = self.graph.metadata();
        let mut tables = BTreeSet::new();
        for ident in self.classifier.referenced_identifiers(error_text) {
            if let Some((qualifier, _)) = ident.split_once('.') {
                if let Some(table) = metadata.canonical_table(qualifier) {
                    tables.insert(table.to_string());
                }
                continue;
            }
            if let Some(table) = metadata.canonical_table(&ident) {
                tables.insert(table.to_string());
                continue;
            }
            tables.extend(
                metadata
                    .tables_owning_column(&ident)
                    .into_iter()
                    .map(str::to_string),
            );
        }
        tables
    }
}

fn tables_of(columns: &[ColumnMatch]) -> BTreeSet<String> {
    columns.iter().map(|column| column.table.clone()).collect()
}

fn group_overlapping(paths: Vec<JoinPath>) -> Vec<Vec<JoinPath>> {
    let mut groups: Vec<Vec<JoinPath>> = Vec::new();
    for path in paths {
        let hits: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| {
                group
                    .iter()
                    .any(|member| member.tables.iter().any(|t| path.contains_table(t)))
            })
            .map(|(index, _)| index)
            .collect();
        match hits.first().copied() {
            None => groups.push(vec![path]),
            Some(target) => {
                for &index in hits[1..].iter().rev() {
                    let absorbed = groups.remove(index);
                    groups[target].extend(absorbed);
                }
                groups[target].push(path);
            }
        }
    }
    groups
}

/// Folds a group of overlapping paths into one join tree, adding each edge
/// only when it brings in a table not yet joined.
fn merge_group(group: Vec<JoinPath>) -> JoinPath {
    let mut members = group.into_iter();
    let Some(first) = members.next() else {
        return JoinPath::default();
    };
    let mut tables = first.tables;
    let mut edges = first.edges;
    let mut pending: Vec<ForeignKey> = members.flat_map(|path| path.edges).collect();

    loop {
        let joined = |table: &str| tables.iter().any(|t| t == table);
        let Some(position) = pending
            .iter()
            .position(|edge| joined(&edge.from_table) || joined(&edge.to_table))
        else {
            break;
        };
        let edge = pending.remove(position);
        match (joined(&edge.from_table), joined(&edge.to_table)) {
            (true, false) => {
                tables.push(edge.to_table.clone());
                edges.push(edge);
            }
            (false, true) => {
                tables.push(edge.from_table.clone());
                edges.push(edge);
            }
            _ => {}
        }
    }

    JoinPath::new(tables, edges)
}
