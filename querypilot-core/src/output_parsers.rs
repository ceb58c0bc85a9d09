use crate::{ActionTag, Plan};

/// Reads planner output of the form
///
/// ```text
/// PLAN: <two or three sentences>
/// ACTIONS: SearchColumn, FindShortestPath, GenerateSQL
/// ```
///
/// Unknown action names are skipped; missing lines yield empty fields.
pub fn parse_plan(text: &str) -> Plan {
    let mut plan = Plan::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_label(line, "PLAN:") {
            plan.plan = rest.trim().to_string();
        } else if let Some(rest) = strip_label(line, "ACTIONS:") {
            for raw in rest.split(',') {
                if let Ok(action) = raw.trim().parse::<ActionTag>() {
                    if !plan.required_actions.contains(&action) {
                        plan.required_actions.push(action);
                    }
                }
            }
        }
    }
    plan
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(&line[label.len()..])
    } else {
        None
    }
}

/// Strips markdown code fences around generated SQL.
pub fn clean_sql(text: &str) -> String {
    let cleaned = text.trim();
    let cleaned = if let Some(rest) = cleaned.strip_prefix("```sql") {
        rest
    } else if let Some(rest) = cleaned.strip_prefix("```SQL") {
        rest
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        rest
    } else {
        cleaned
    };
    cleaned.trim_end_matches("```").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan_and_actions() {
        let text = "PLAN: Look up players and join their teams.\nACTIONS: SearchColumn, FindShortestPath, GenerateSQL, ExecuteSQL";
        let plan = parse_plan(text);
        assert_eq!(plan.plan, "Look up players and join their teams.");
        assert_eq!(
            plan.required_actions,
            vec![
                ActionTag::SearchColumn,
                ActionTag::FindShortestPath,
                ActionTag::GenerateSql,
                ActionTag::ExecuteSql
            ]
        );
    }

    #[test]
    fn unknown_actions_are_dropped() {
        let plan = parse_plan("actions: SearchValue, Dance, search_column");
        assert_eq!(
            plan.required_actions,
            vec![ActionTag::SearchValue, ActionTag::SearchColumn]
        );
        assert!(plan.plan.is_empty());
    }

    #[test]
    fn clean_sql_strips_fences() {
        assert_eq!(clean_sql("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```\nSELECT 2\n```"), "SELECT 2");
        assert_eq!(clean_sql("  SELECT 3  "), "SELECT 3");
    }
}
