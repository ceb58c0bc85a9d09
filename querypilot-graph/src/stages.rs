//! Stage handlers. Each one reads and writes the session state; failures of
//! collaborators are recorded in the state rather than propagated.

use querypilot_core::{
    clean_sql, ActionTag, AnswerRequest, ColumnMatch, JoinPath, PlanRequest, SqlRequest,
    ValueMatch,
};
use querypilot_join::PathResolution;

use crate::{ConfirmationType, FailureKind, HumanResponse, SessionState, SqlWorkflow, Stage};

const PREVIEW_ROWS: usize = 5;

impl SqlWorkflow {
    pub(crate) async fn planning(&self, state: &mut SessionState) {
        state.plan_approved = false;
        let request = PlanRequest {
            question: &state.question,
            schema_summary: &state.schema_summary,
            prior_turns: &state.prior_turns,
            guidance: &state.guidance,
        };
        let plan = match self.language.generate_plan(&request).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(session_id = %state.session_id, error = %err, "planning failed");
                state.fail(
                    FailureKind::PlanningFailure,
                    format!("I'm sorry, I couldn't work out how to answer that question: {err}"),
                );
                return;
            }
        };
        if plan.plan.trim().is_empty() && plan.required_actions.is_empty() {
            state.fail(
                FailureKind::PlanningFailure,
                "I'm sorry, I couldn't work out how to answer that question.",
            );
            return;
        }

        state.needs_column_search = plan.requires(ActionTag::SearchColumn);
        state.needs_value_search = plan.requires(ActionTag::SearchValue);
        state.path_finding_requested = plan.requires(ActionTag::FindShortestPath);
        state.needs_path_finding = state.path_finding_requested;
        let actions: Vec<&str> = plan.required_actions.iter().map(ActionTag::as_str).collect();
        state.record_step(
            Stage::Planning,
            format!("Plan: {}. Required actions: {}", plan.plan, actions.join(", ")),
        );
        state.plan = plan.plan;
        state.required_actions = plan.required_actions;
    }

    pub(crate) async fn search_columns(&self, state: &mut SessionState) {
        let queries = match self
            .language
            .column_search_queries(&state.question, &state.plan)
            .await
        {
            Ok(queries) if !queries.is_empty() => queries,
            Ok(_) => vec![state.question.clone()],
            Err(err) => {
                tracing::warn!(error = %err, "column query expansion failed; using the question");
                vec![state.question.clone()]
            }
        };

        let candidates = self.schema.metadata().column_infos();
        let mut matches: Vec<ColumnMatch> = Vec::new();
        let mut failure = None;
        match &self.column_scorer {
            Some(scorer) => {
                for query in &queries {
                    match scorer
                        .search_columns(query, &candidates, self.config.column_top_k)
                        .await
                    {
                        Ok(found) => {
                            for column in found {
                                if !matches.iter().any(|known| known.same_column(&column)) {
                                    matches.push(column);
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(query = %query, error = %err, "column search failed");
                            failure = Some(err.to_string());
                        }
                    }
                }
            }
            None => failure = Some("no column scorer configured".to_string()),
        }
        if let Some(reason) = failure {
            state.record_step(
                Stage::SearchColumns,
                format!("{:?}: column search incomplete ({reason})", FailureKind::SearchFailure),
            );
        }

        if matches.len() < self.config.column_fallback_threshold {
            let added = self.enumerate_fallback_columns(&state.question, &mut matches);
            if added > 0 {
                state.record_step(
                    Stage::SearchColumns,
                    format!("Few columns matched; added {added} columns from implicated tables"),
                );
            }
        }

        let names: Vec<String> = matches
            .iter()
            .map(ColumnMatch::qualified_name)
            .collect();
        state.record_step(
            Stage::SearchColumns,
            format!("Found {} relevant columns: {}", matches.len(), names.join(", ")),
        );
        state.relevant_columns = matches;
        state.needs_column_search = false;
        self.assess_joins(state);
    }

    /// Adds every column of the implicated tables, up to the configured cap.
    /// Implicated tables are those of the weak matches, or failing that the
    /// tables the question names.
    fn enumerate_fallback_columns(&self, question: &str, matches: &mut Vec<ColumnMatch>) -> usize {
        let metadata = self.schema.metadata();
        let mut tables: Vec<String> = Vec::new();
        for column in matches.iter() {
            if !tables.contains(&column.table) {
                tables.push(column.table.clone());
            }
        }
        if tables.is_empty() {
            tables = metadata.tables_named_in(question);
        }

        let before = matches.len();
        'tables: for table in &tables {
            for info in metadata.columns_of(table) {
                if matches.len() >= self.config.column_fallback_cap {
                    break 'tables;
                }
                let candidate = ColumnMatch::from_info(&info, 0.0);
                if !matches.iter().any(|known| known.same_column(&candidate)) {
                    matches.push(candidate);
                }
            }
        }
        matches.len() - before
    }

    pub(crate) async fn search_values(&self, state: &mut SessionState) {
        if !state.needs_value_search {
            state.record_step(Stage::SearchValues, "Value search not required");
            self.assess_joins(state);
            return;
        }

        let mut terms = match self
            .language
            .value_search_terms(&state.question, &state.plan, &state.relevant_columns)
            .await
        {
            Ok(terms) => terms,
            Err(err) => {
                tracing::warn!(error = %err, "value term extraction failed");
                state.record_step(
                    Stage::SearchValues,
                    format!("{:?}: could not extract search terms ({err})", FailureKind::SearchFailure),
                );
                Vec::new()
            }
        };
        terms.retain(|term| !term.trim().is_empty());
        terms.truncate(self.config.max_value_terms);

        let mut matches: Vec<ValueMatch> = Vec::new();
        match &self.value_scorer {
            Some(scorer) if !terms.is_empty() => {
                let candidates = self.schema.metadata().candidate_values();
                for term in &terms {
                    match scorer
                        .search_values(term, &candidates, self.config.value_top_k)
                        .await
                    {
                        Ok(found) => {
                            for value in found {
                                if !matches.iter().any(|known| same_value(known, &value)) {
                                    matches.push(value);
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(term = %term, error = %err, "value search failed");
                            state.record_step(
                                Stage::SearchValues,
                                format!("{:?}: value search for '{term}' failed ({err})", FailureKind::SearchFailure),
                            );
                        }
                    }
                }
            }
            Some(_) => {}
            None => state.record_step(
                Stage::SearchValues,
                format!("{:?}: no value scorer configured", FailureKind::SearchFailure),
            ),
        }

        let rendered: Vec<String> = matches
            .iter()
            .map(|value| format!("{}.{} = '{}'", value.table, value.column, value.value))
            .collect();
        state.record_step(
            Stage::SearchValues,
            format!("Found {} relevant values: {}", matches.len(), rendered.join(", ")),
        );
        state.relevant_values = matches;
        state.needs_value_search = false;
        self.assess_joins(state);
    }

    fn assess_joins(&self, state: &mut SessionState) {
        let decision = self.necessity.classify(
            &state.question,
            state.distinct_tables().len(),
            state.path_finding_requested,
        );
        state.needs_path_finding = decision.needs_path_finding;
        state.path_finding_deferred = decision.path_finding_deferred;
        state.single_table_with_join_indicators = decision.single_table_with_join_indicators;
    }

    pub(crate) fn find_paths(&self, state: &mut SessionState) {
        if state.needs_path_finding {
            let resolution = self.resolver.resolve(state.distinct_tables());
            record_resolution(state, Stage::FindPaths, resolution);
        } else if state.path_finding_deferred {
            state.record_step(
                Stage::FindPaths,
                "Join indicators on a single table; deferring path finding to SQL generation",
            );
        } else {
            state.record_step(Stage::FindPaths, "Single-table query; path finding skipped");
        }
    }

    pub(crate) async fn generate_sql(&self, state: &mut SessionState) {
        state.sql_approved = false;
        if state.path_finding_deferred && state.join_paths.is_empty() {
            let resolution = self.resolver.resolve_deferred(
                &state.relevant_columns,
                &state.relevant_values,
                &state.question,
            );
            record_resolution(state, Stage::GenerateSql, resolution);
        }

        let request = SqlRequest {
            question: &state.question,
            schema_summary: &state.schema_summary,
            columns: &state.relevant_columns,
            values: &state.relevant_values,
            join_paths: &state.join_paths,
            prior_attempts: &state.sql_history,
            last_error: state.execution_error.as_deref(),
            human_feedback: state.human_feedback.as_deref(),
            guidance: &state.guidance,
            prior_turns: &state.prior_turns,
        };
        match self.language.generate_sql(&request).await {
            Ok(raw) => {
                let sql = clean_sql(&raw);
                if sql.is_empty() {
                    state.ready_to_execute = false;
                    state.generation_error = Some("the language service returned no SQL".into());
                    state.record_step(Stage::GenerateSql, "Generated SQL was empty");
                    return;
                }
                state.selected_path_indices = select_paths(&sql, &state.join_paths);
                state.record_step(Stage::GenerateSql, format!("Generated SQL: {sql}"));
                state.sql_query = sql.clone();
                state.sql_history.push(sql);
                state.generation_error = None;
                state.ready_to_execute = true;
            }
            Err(err) => {
                tracing::warn!(session_id = %state.session_id, error = %err, "sql generation failed");
                state.ready_to_execute = false;
                state.record_step(Stage::GenerateSql, format!("SQL generation failed: {err}"));
                state.generation_error = Some(err.to_string());
            }
        }
    }

    pub(crate) async fn execute_sql(&self, state: &mut SessionState) {
        state.ready_to_execute = false;
        match self.executor.execute(&state.sql_query).await {
            Ok(mut result) => {
                result.truncate(self.config.result_row_limit);
                state.record_step(
                    Stage::ExecuteSql,
                    format!(
                        "Query executed successfully. Result: {}",
                        result.preview(PREVIEW_ROWS)
                    ),
                );
                state.execution_result = Some(result);
                state.execution_error = None;
            }
            Err(err) => {
                let text = err.execution_text();
                let kind = self.classifier.classify(&text);
                tracing::warn!(
                    session_id = %state.session_id,
                    iteration = state.iteration,
                    kind = ?kind,
                    error = %text,
                    "sql execution failed"
                );
                state.record_step(
                    Stage::ExecuteSql,
                    format!("{:?} ({kind:?}): {text}", FailureKind::ExecutionError),
                );
                state.execution_result = None;
                state.execution_error = Some(text.clone());

                if state.fallback_error.as_deref() != Some(text.as_str()) {
                    if let Some(resolution) = self.resolver.resolve_from_error(
                        &state.relevant_columns,
                        &state.join_paths,
                        &text,
                    ) {
                        state.fallback_error = Some(text);
                        record_resolution(state, Stage::ExecuteSql, resolution);
                    }
                }
            }
        }
    }

    pub(crate) async fn answer(&self, state: &mut SessionState) {
        let Some(result) = state.execution_result.as_ref() else {
            let reason = state
                .generation_error
                .clone()
                .unwrap_or_else(|| "no query could be produced".to_string());
            state.fail(
                FailureKind::GenerationFailure,
                format!("I couldn't generate a SQL query for this question: {reason}"),
            );
            return;
        };

        let request = AnswerRequest {
            question: &state.question,
            sql: &state.sql_query,
            result,
        };
        let answer = match self.language.generate_answer(&request).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "answer generation failed; returning raw result");
                format!(
                    "The query returned {} row(s): {}",
                    result.row_count(),
                    result.preview(PREVIEW_ROWS)
                )
            }
        };
        state.record_step(Stage::Answer, "Answer generated");
        state.final_answer = Some(answer);
    }

    pub(crate) fn human_interaction(&self, state: &mut SessionState) {
        let Some(response) = state.human_response.take() else {
            return;
        };
        state.awaiting_confirmation = false;
        let kind = state.confirmation_type.unwrap_or(ConfirmationType::Error);
        match (kind, response) {
            (ConfirmationType::Plan, HumanResponse::Approve) => {
                state.plan_approved = true;
                state.record_step(Stage::HumanInteraction, "Plan approved");
            }
            (ConfirmationType::Plan, HumanResponse::Revise(text)) => {
                state.record_step(Stage::HumanInteraction, format!("Plan revision requested: {text}"));
                state.guidance.push(text);
            }
            (ConfirmationType::Sql, HumanResponse::Approve) => {
                state.sql_approved = true;
                state.record_step(Stage::HumanInteraction, "SQL approved");
            }
            (ConfirmationType::Sql, HumanResponse::Revise(text)) => {
                state.record_step(Stage::HumanInteraction, format!("SQL revision requested: {text}"));
                state.human_feedback = Some(text.clone());
                state.guidance.push(text);
            }
            (ConfirmationType::Error, HumanResponse::Approve) => {
                state.record_step(Stage::HumanInteraction, "Retrying without additional guidance");
            }
            (ConfirmationType::Error, HumanResponse::Revise(text)) => {
                state.record_step(Stage::HumanInteraction, format!("Human feedback: {text}"));
                state.human_feedback = Some(text);
            }
        }
    }
}

/// Adds newly found paths and logs pairs that could not be connected.
fn record_resolution(state: &mut SessionState, stage: Stage, resolution: PathResolution) {
    for (left, right) in &resolution.unconnected {
        state.record_step(
            stage,
            format!("{:?}: no join path between {left} and {right}", FailureKind::JoinUnresolved),
        );
    }
    if !resolution.unknown.is_empty() {
        state.record_step(
            stage,
            format!("Ignoring unknown tables: {}", resolution.unknown.join(", ")),
        );
    }
    let mut added = 0;
    for path in resolution.paths {
        if !state.join_paths.contains(&path) {
            state.join_paths.push(path);
            added += 1;
        }
    }
    let rendered: Vec<String> = state.join_paths.iter().map(ToString::to_string).collect();
    state.record_step(
        stage,
        format!("Found {added} new join paths; known paths: [{}]", rendered.join("; ")),
    );
}

fn same_value(left: &ValueMatch, right: &ValueMatch) -> bool {
    left.table.eq_ignore_ascii_case(&right.table)
        && left.column.eq_ignore_ascii_case(&right.column)
        && left.value == right.value
}

/// Paths whose every table is referenced by the generated SQL.
fn select_paths(sql: &str, paths: &[JoinPath]) -> std::collections::BTreeSet<usize> {
    let words: std::collections::HashSet<String> = sql
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    paths
        .iter()
        .enumerate()
        .filter(|(_, path)| {
            path.hops() > 0
                && path
                    .tables
                    .iter()
                    .all(|table| words.contains(&table.to_lowercase()))
        })
        .map(|(index, _)| index)
        .collect()
}
