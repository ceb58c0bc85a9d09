use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A column offered to the column scorer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ColumnMatch {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub score: f32,
}

impl ColumnMatch {
    pub fn from_info(info: &ColumnInfo, score: f32) -> Self {
        Self {
            table: info.table.clone(),
            column: info.column.clone(),
            data_type: info.data_type.clone(),
            score,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    pub fn same_column(&self, other: &ColumnMatch) -> bool {
        self.table.eq_ignore_ascii_case(&other.table)
            && self.column.eq_ignore_ascii_case(&other.column)
    }
}

/// A stored cell value offered to the value scorer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CandidateValue {
    pub table: String,
    pub column: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValueMatch {
    pub table: String,
    pub column: String,
    pub value: String,
    pub score: f32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Explicit single-column foreign key.
    #[default]
    Declared,
    /// One column of a multi-column key.
    Composite,
    /// Relationship guessed from naming rather than declared.
    Inferred,
}

impl KeyKind {
    pub fn penalty(self) -> usize {
        match self {
            KeyKind::Declared => 0,
            KeyKind::Composite => 1,
            KeyKind::Inferred => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub kind: KeyKind,
}

impl ForeignKey {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
            kind: KeyKind::Declared,
        }
    }

    pub fn with_kind(mut self, kind: KeyKind) -> Self {
        self.kind = kind;
        self
    }

    /// The table on the far side of the edge, if `table` is one of its ends.
    pub fn other_end(&self, table: &str) -> Option<&str> {
        if self.from_table == table {
            Some(&self.to_table)
        } else if self.to_table == table {
            Some(&self.from_table)
        } else {
            None
        }
    }

    pub fn condition(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

/// Ranking key for join paths: fewer hops first, then fewer non-declared keys.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathRank {
    pub hops: usize,
    pub penalty: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinPath {
    pub tables: Vec<String>,
    pub edges: Vec<ForeignKey>,
    pub rank_score: PathRank,
}

impl JoinPath {
    pub fn new(tables: Vec<String>, edges: Vec<ForeignKey>) -> Self {
        let rank_score = PathRank {
            hops: edges.len(),
            penalty: edges.iter().map(|edge| edge.kind.penalty()).sum(),
        };
        Self {
            tables,
            edges,
            rank_score,
        }
    }

    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Renders `FROM first JOIN next ON ...` in edge order. Each edge joins
    /// the table not yet in scope.
    pub fn join_clause(&self) -> String {
        let Some(first) = self.tables.first() else {
            return String::new();
        };
        let mut in_scope = vec![first.as_str()];
        let mut clause = format!("FROM {first}");
        for edge in &self.edges {
            let joined = if in_scope.contains(&edge.from_table.as_str()) {
                edge.to_table.as_str()
            } else {
                edge.from_table.as_str()
            };
            clause.push_str(&format!(" JOIN {joined} ON {}", edge.condition()));
            in_scope.push(joined);
        }
        clause
    }
}

impl fmt::Display for JoinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tables.join(" <-> "))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub truncated: bool,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            truncated: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn truncate(&mut self, limit: usize) {
        if self.rows.len() > limit {
            self.rows.truncate(limit);
            self.truncated = true;
        }
    }

    /// Compact single-line rendering used in step logs and fallback answers.
    pub fn preview(&self, max_rows: usize) -> String {
        let rows: Vec<String> = self
            .rows
            .iter()
            .take(max_rows)
            .map(|row| {
                let cells: Vec<String> = row.iter().map(render_cell).collect();
                format!("({})", cells.join(", "))
            })
            .collect();
        let mut out = format!("[{}]", rows.join(", "));
        if self.rows.len() > max_rows || self.truncated {
            out.push_str(" ...");
        }
        out
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
