use querypilot_core::{
    ActionTag, ColumnInfo, ColumnMatch, ForeignKey, JoinPath, KeyKind, PathRank, TabularResult,
};
use serde_json::json;

#[test]
fn join_path_rank_counts_hops_and_penalty() {
    let path = JoinPath::new(
        vec!["Player".into(), "Match".into(), "Team".into()],
        vec![
            ForeignKey::new("Match", "player_id", "Player", "id"),
            ForeignKey::new("Match", "team_id", "Team", "id").with_kind(KeyKind::Inferred),
        ],
    );
    assert_eq!(path.rank_score, PathRank { hops: 2, penalty: 2 });
}

#[test]
fn path_rank_orders_hops_before_penalty() {
    let short_inferred = PathRank { hops: 1, penalty: 2 };
    let long_declared = PathRank { hops: 2, penalty: 0 };
    assert!(short_inferred < long_declared);
}

#[test]
fn join_clause_walks_edges_in_either_direction() {
    let path = JoinPath::new(
        vec!["Team".into(), "Player".into()],
        vec![ForeignKey::new("Player", "team_id", "Team", "id")],
    );
    assert_eq!(
        path.join_clause(),
        "FROM Team JOIN Player ON Player.team_id = Team.id"
    );
    assert_eq!(path.to_string(), "Team <-> Player");
}

#[test]
fn tabular_result_truncates_and_previews() {
    let mut result = TabularResult::new(
        vec!["name".into()],
        (0..5).map(|i| vec![json!(format!("p{i}"))]).collect(),
    );
    result.truncate(3);
    assert_eq!(result.row_count(), 3);
    assert!(result.truncated);
    assert_eq!(result.preview(2), "[(p0), (p1)] ...");
}

#[test]
fn action_tags_parse_leniently() {
    assert_eq!("GenerateSQL".parse::<ActionTag>().unwrap(), ActionTag::GenerateSql);
    assert_eq!(
        "find_shortest_path".parse::<ActionTag>().unwrap(),
        ActionTag::FindShortestPath
    );
    assert!("Dance".parse::<ActionTag>().is_err());
}

#[test]
fn foreign_key_defaults_to_declared_when_deserialized() {
    let fk: ForeignKey = serde_json::from_value(json!({
        "from_table": "Player",
        "from_column": "team_id",
        "to_table": "Team",
        "to_column": "id"
    }))
    .unwrap();
    assert_eq!(fk.kind, KeyKind::Declared);
    assert_eq!(fk.other_end("Team"), Some("Player"));
}

#[test]
fn column_matches_render_qualified_names() {
    let info = ColumnInfo {
        table: "Player".into(),
        column: "player_name".into(),
        data_type: "TEXT".into(),
        description: None,
    };
    let matched = ColumnMatch::from_info(&info, 0.8);
    assert_eq!(matched.qualified_name(), "Player.player_name");
}
