#![allow(dead_code)]

use std::sync::Arc;

use querypilot_join::{PathResolver, SchemaGraph, SchemaMetadata};

pub const SOCCER_SCHEMA: &str = r#"{
    "tables": [
        {"name": "Country", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "name", "type": "TEXT"}
        ]},
        {"name": "League", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "country_id", "type": "INTEGER"},
            {"name": "name", "type": "TEXT"}
        ]},
        {"name": "Team", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "team_long_name", "type": "TEXT"}
        ]},
        {"name": "Player", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "player_name", "type": "TEXT"},
            {"name": "team_id", "type": "INTEGER"}
        ]},
        {"name": "Match", "columns": [
            {"name": "id", "type": "INTEGER"},
            {"name": "country_id", "type": "INTEGER"},
            {"name": "league_id", "type": "INTEGER"},
            {"name": "home_team_id", "type": "INTEGER"},
            {"name": "away_team_id", "type": "INTEGER"},
            {"name": "home_team_goal", "type": "INTEGER"}
        ]},
        {"name": "Audit", "columns": [{"name": "id", "type": "INTEGER"}]}
    ],
    "foreign_keys": [
        {"from_table": "League", "from_column": "country_id", "to_table": "Country", "to_column": "id"},
        {"from_table": "Match", "from_column": "country_id", "to_table": "Country", "to_column": "id"},
        {"from_table": "Match", "from_column": "league_id", "to_table": "League", "to_column": "id"},
        {"from_table": "Match", "from_column": "home_team_id", "to_table": "Team", "to_column": "id"},
        {"from_table": "Match", "from_column": "away_team_id", "to_table": "Team", "to_column": "id"},
        {"from_table": "Player", "from_column": "team_id", "to_table": "Team", "to_column": "id"}
    ]
}"#;

pub fn soccer_metadata() -> SchemaMetadata {
    SchemaMetadata::from_json_str(SOCCER_SCHEMA).unwrap()
}

pub fn soccer_graph() -> Arc<SchemaGraph> {
    Arc::new(SchemaGraph::from_metadata(soccer_metadata()).unwrap())
}

pub fn soccer_resolver() -> PathResolver {
    PathResolver::new(soccer_graph())
}
