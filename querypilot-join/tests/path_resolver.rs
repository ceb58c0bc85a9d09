mod common;

use querypilot_core::{ColumnMatch, ValueMatch};

fn column(table: &str, name: &str) -> ColumnMatch {
    ColumnMatch {
        table: table.to_string(),
        column: name.to_string(),
        data_type: "TEXT".to_string(),
        score: 0.9,
    }
}

#[test]
fn player_and_team_resolve_to_one_edge() {
    let resolver = common::soccer_resolver();
    let resolution = resolver.resolve(["Player", "Team"]);
    assert_eq!(resolution.paths.len(), 1);
    let path = &resolution.paths[0];
    assert_eq!(path.tables, vec!["Player", "Team"]);
    assert_eq!(path.edges.len(), 1);
    assert!(resolution.fully_connected());
}

#[test]
fn resolve_is_deterministic_across_input_order_and_case() {
    let resolver = common::soccer_resolver();
    let first = resolver.resolve(["Team", "Player", "Country"]);
    let second = resolver.resolve(["country", "player", "team"]);
    let third = resolver.resolve(["Team", "Player", "Country"]);
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn overlapping_pairs_merge_into_one_join_tree() {
    let resolver = common::soccer_resolver();
    let resolution = resolver.resolve(["Player", "Team", "Country"]);
    assert_eq!(resolution.paths.len(), 1);
    let path = &resolution.paths[0];
    assert_eq!(path.tables, vec!["Player", "Team", "Match", "Country"]);
    assert_eq!(path.hops(), 3);
    assert_eq!(
        path.join_clause(),
        "FROM Player JOIN Team ON Player.team_id = Team.id \
         JOIN Match ON Match.home_team_id = Team.id \
         JOIN Country ON Match.country_id = Country.id"
    );
}

#[test]
fn unconnected_pairs_are_reported_not_fatal() {
    let resolver = common::soccer_resolver();
    let resolution = resolver.resolve(["Player", "Audit", "Goalposts"]);
    assert!(resolution.is_empty());
    assert_eq!(
        resolution.unconnected,
        vec![("Audit".to_string(), "Player".to_string())]
    );
    assert_eq!(resolution.unknown, vec!["Goalposts".to_string()]);
}

#[test]
fn single_table_needs_no_paths() {
    let resolver = common::soccer_resolver();
    assert!(resolver.resolve(["Player"]).is_empty());
}

#[test]
fn deferred_resolution_picks_up_tables_named_in_question() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name")];
    let resolution = resolver.resolve_deferred(&columns, &[], "Show me players and their teams");
    assert_eq!(resolution.paths.len(), 1);
    assert_eq!(resolution.paths[0].tables, vec!["Player", "Team"]);
}

#[test]
fn deferred_resolution_uses_value_tables() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name")];
    let values = vec![ValueMatch {
        table: "Team".to_string(),
        column: "team_long_name".to_string(),
        value: "FC Barcelona".to_string(),
        score: 3.2,
    }];
    let resolution = resolver.resolve_deferred(&columns, &values, "Who is on Barcelona?");
    assert_eq!(resolution.paths[0].tables, vec!["Player", "Team"]);
}

#[test]
fn fallback_resolution_reads_tables_from_error_text() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name")];
    let resolution = resolver
        .resolve_from_error(&columns, &[], "no such column: Team.team_long_name")
        .unwrap();
    assert_eq!(resolution.paths[0].tables, vec!["Player", "Team"]);
}

#[test]
fn fallback_resolution_maps_bare_columns_to_owning_tables() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name")];
    let resolution = resolver
        .resolve_from_error(&columns, &[], "no such column: home_team_goal")
        .unwrap();
    assert_eq!(resolution.paths[0].tables, vec!["Match", "Team", "Player"]);
}

#[test]
fn fallback_resolution_is_idempotent() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name"), column("Match", "id")];
    let error = "no such column 'goals_scored'";
    let first = resolver.resolve_from_error(&columns, &[], error).unwrap();
    let second = resolver.resolve_from_error(&columns, &[], error).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.paths.len(), 1);
}

#[test]
fn fallback_requires_join_related_error_and_no_known_paths() {
    let resolver = common::soccer_resolver();
    let columns = vec![column("Player", "player_name"), column("Team", "id")];
    assert!(resolver
        .resolve_from_error(&columns, &[], "near \"SELEC\": syntax error")
        .is_none());

    let known = resolver.resolve(["Player", "Team"]).paths;
    assert!(resolver
        .resolve_from_error(&columns, &known, "ambiguous column name: id")
        .is_none());
}
