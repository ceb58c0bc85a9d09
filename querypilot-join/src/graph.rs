use std::collections::{HashMap, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use querypilot_core::{ForeignKey, JoinPath};

use crate::{JoinError, SchemaMetadata};

/// Tables as nodes, foreign keys as edges. Traversal ignores direction; the
/// edge weight keeps it for SQL emission. Never mutated after construction,
/// so one instance can be shared by every session.
#[derive(Debug)]
pub struct SchemaGraph {
    graph: UnGraph<String, ForeignKey>,
    name_to_index: HashMap<String, NodeIndex>,
    metadata: SchemaMetadata,
}

impl SchemaGraph {
    pub fn from_metadata(metadata: SchemaMetadata) -> Result<Self, JoinError> {
        let mut graph = UnGraph::new_undirected();
        let mut name_to_index = HashMap::new();

        for table in &metadata.tables {
            if name_to_index.contains_key(&table.name) {
                return Err(JoinError::DuplicateTable(table.name.clone()));
            }
            let index = graph.add_node(table.name.clone());
            name_to_index.insert(table.name.clone(), index);
        }

        for key in &metadata.foreign_keys {
            let from = lookup(&name_to_index, &key.from_table, key)?;
            let to = lookup(&name_to_index, &key.to_table, key)?;
            graph.add_edge(from, to, key.clone());
        }

        tracing::debug!(
            tables = graph.node_count(),
            foreign_keys = graph.edge_count(),
            "schema graph built"
        );

        Ok(Self {
            graph,
            name_to_index,
            metadata,
        })
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        &self.metadata
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn canonical_table(&self, name: &str) -> Option<&str> {
        self.metadata.canonical_table(name)
    }

    fn node(&self, name: &str) -> Option<NodeIndex> {
        let canonical = self.canonical_table(name)?;
        self.name_to_index.get(canonical).copied()
    }

    /// Incident edges in declaration order, paired with the far endpoint.
    fn neighbors_in_order(&self, node: NodeIndex) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut out: Vec<(NodeIndex, EdgeIndex)> = self
            .graph
            .edges(node)
            .filter_map(|edge| {
                let other = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                (other != node).then_some((other, edge.id()))
            })
            .collect();
        out.sort_by_key(|(_, edge)| edge.index());
        out
    }

    /// Breadth-first shortest path. Among equal-hop paths the one with the
    /// lower key penalty wins; further ties go to the earlier-declared edge.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<JoinPath> {
        let start = self.node(from)?;
        let goal = self.node(to)?;
        if start == goal {
            return Some(JoinPath::new(vec![self.graph[start].clone()], Vec::new()));
        }

        let mut depth: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut penalty: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut parent: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if node == goal {
                break;
            }
            let node_depth = depth[&node];
            let node_penalty = penalty[&node];
            for (next, edge) in self.neighbors_in_order(node) {
                let candidate = node_penalty + self.graph[edge].kind.penalty();
                match depth.get(&next).copied() {
                    None => {
                        depth.insert(next, node_depth + 1);
                        penalty.insert(next, candidate);
                        parent.insert(next, (node, edge));
                        queue.push_back(next);
                    }
                    Some(next_depth) if next_depth == node_depth + 1 => {
                        if candidate < penalty[&next] {
                            penalty.insert(next, candidate);
                            parent.insert(next, (node, edge));
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        if !parent.contains_key(&goal) {
            return None;
        }

        let mut tables = vec![self.graph[goal].clone()];
        let mut edges = Vec::new();
        let mut cursor = goal;
        while let Some(&(previous, edge)) = parent.get(&cursor) {
            edges.push(self.graph[edge].clone());
            tables.push(self.graph[previous].clone());
            cursor = previous;
        }
        tables.reverse();
        edges.reverse();
        Some(JoinPath::new(tables, edges))
    }
}

fn lookup(
    index: &HashMap<String, NodeIndex>,
    table: &str,
    key: &ForeignKey,
) -> Result<NodeIndex, JoinError> {
    index
        .get(table)
        .copied()
        .ok_or_else(|| JoinError::UnknownTable {
            table: table.to_string(),
            key: key.to_string(),
        })
}
