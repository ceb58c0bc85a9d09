use std::fmt::Write as _;
use std::path::Path;

use querypilot_core::{CandidateValue, ColumnInfo, ForeignKey};
use serde::{Deserialize, Serialize};

use crate::JoinError;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(default, alias = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Representative stored values, offered to the value scorer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TableMeta {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
}

/// Table and foreign-key metadata the schema graph is built from.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaMetadata {
    #[serde(default)]
    pub tables: Vec<TableMeta>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl SchemaMetadata {
    pub fn from_json_str(raw: &str) -> Result<Self, JoinError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, JoinError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        let canonical = self.canonical_table(name)?;
        self.tables.iter().find(|table| table.name == canonical)
    }

    /// Case-insensitive table lookup that also accepts simple plurals
    /// (`teams` -> `Team`, `countries` -> `Country`).
    pub fn canonical_table(&self, name: &str) -> Option<&str> {
        let lowered = name.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        let mut forms = vec![lowered.clone()];
        if let Some(stem) = lowered.strip_suffix("ies") {
            forms.push(format!("{stem}y"));
        }
        if let Some(stem) = lowered.strip_suffix("es") {
            forms.push(stem.to_string());
        }
        if let Some(stem) = lowered.strip_suffix('s') {
            forms.push(stem.to_string());
        }
        forms.iter().find_map(|form| {
            self.tables
                .iter()
                .find(|table| table.name.to_ascii_lowercase() == *form)
                .map(|table| table.name.as_str())
        })
    }

    /// Schema tables mentioned by name in free text, in order of mention.
    pub fn tables_named_in(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for word in text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
            if let Some(table) = self.canonical_table(word) {
                if !found.iter().any(|seen| seen == table) {
                    found.push(table.to_string());
                }
            }
        }
        found
    }

    pub fn tables_owning_column(&self, column: &str) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|table| {
                table
                    .columns
                    .iter()
                    .any(|meta| meta.name.eq_ignore_ascii_case(column))
            })
            .map(|table| table.name.as_str())
            .collect()
    }

    pub fn column_infos(&self) -> Vec<ColumnInfo> {
        self.tables.iter().flat_map(table_column_infos).collect()
    }

    pub fn columns_of(&self, table: &str) -> Vec<ColumnInfo> {
        self.table(table).map(table_column_infos).unwrap_or_default()
    }

    pub fn candidate_values(&self) -> Vec<CandidateValue> {
        let mut values = Vec::new();
        for table in &self.tables {
            for column in &table.columns {
                for value in &column.sample_values {
                    values.push(CandidateValue {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        values
    }

    pub fn summary(&self) -> String {
        let mut out = String::from("Database Schema:\n");
        let _ = writeln!(out, "Tables: {}", self.table_names().join(", "));
        out.push_str("\nForeign Keys:\n");
        for key in &self.foreign_keys {
            let _ = writeln!(out, "  {key}");
        }
        out
    }
}

fn table_column_infos(table: &TableMeta) -> Vec<ColumnInfo> {
    table
        .columns
        .iter()
        .map(|column| ColumnInfo {
            table: table.name.clone(),
            column: column.name.clone(),
            data_type: column.data_type.clone(),
            description: column.description.clone(),
        })
        .collect()
}
