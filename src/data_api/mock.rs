//! Mock Data API for testing.
//!
//! Replays scripted statement lifecycles without touching the network and
//! records every call so tests can assert on the exact protocol traffic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::types::{
    ColumnMetadata, DescribeStatementOutput, ExecuteStatementInput, ExecuteStatementOutput,
    Field, GetStatementResultOutput, StatementStatus,
};
use super::DataApi;
use crate::error::{ConnectorError, Result};

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Execute(ExecuteStatementInput),
    Describe(String),
    GetResult {
        statement_id: String,
        next_token: Option<String>,
    },
}

/// Scripted lifecycle of one statement.
#[derive(Debug, Clone)]
pub struct StatementScript {
    /// Rejection message for the execute call.
    rejection: Option<String>,
    /// Statuses returned by successive describe calls; the last one repeats.
    statuses: Vec<StatementStatus>,
    /// Error detail reported alongside FAILED.
    error: Option<String>,
    pages: Vec<GetStatementResultOutput>,
    /// Page index whose fetch fails, with the message.
    page_failure: Option<(usize, String)>,
}

impl StatementScript {
    /// A statement that finishes immediately with a single page of rows.
    pub fn rows(columns: &[&str], rows: Vec<Vec<Field>>) -> Self {
        Self::pages(columns, vec![rows])
    }

    /// A statement that finishes immediately with the given pages.
    ///
    /// Continuation tokens are assigned by the mock.
    pub fn pages(columns: &[&str], pages: Vec<Vec<Vec<Field>>>) -> Self {
        let metadata: Vec<ColumnMetadata> = columns
            .iter()
            .map(|name| ColumnMetadata::new(*name, "varchar"))
            .collect();
        let pages = pages
            .into_iter()
            .map(|records| GetStatementResultOutput {
                records,
                column_metadata: metadata.clone(),
                next_token: None,
            })
            .collect();

        Self {
            rejection: None,
            statuses: vec![StatementStatus::Finished],
            error: None,
            pages,
            page_failure: None,
        }
    }

    /// A statement whose execute call is rejected.
    pub fn rejected(message: impl Into<String>) -> Self {
        let mut script = Self::rows(&[], vec![]);
        script.rejection = Some(message.into());
        script
    }

    /// Replaces the status sequence seen by the poller.
    pub fn with_statuses(mut self, statuses: Vec<StatementStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Sets the provider error detail reported with FAILED.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Makes the fetch of page `index` fail.
    pub fn with_page_failure(mut self, index: usize, message: impl Into<String>) -> Self {
        self.page_failure = Some((index, message.into()));
        self
    }
}

struct RunningStatement {
    script: StatementScript,
    describes: usize,
}

#[derive(Default)]
struct MockState {
    scripts: Vec<(String, StatementScript)>,
    running: HashMap<String, RunningStatement>,
    calls: Vec<MockCall>,
    next_id: usize,
}

/// A mock Data API that returns scripted responses.
///
/// Scripts are matched against submitted SQL by case-insensitive substring,
/// first match wins. Unmatched SQL is rejected.
#[derive(Default)]
pub struct MockDataApi {
    state: Mutex<MockState>,
}

impl MockDataApi {
    /// Creates a mock with no scripted statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the statement whose SQL contains `pattern`.
    pub fn with_statement(self, pattern: impl Into<String>, script: StatementScript) -> Self {
        self.lock()
            .scripts
            .push((pattern.into().to_lowercase(), script));
        self
    }

    /// Scripts the table discovery query to return the given `schema.table` names.
    pub fn with_tables(self, tables: &[&str]) -> Self {
        let rows = tables
            .iter()
            .map(|qualified| {
                let (schema, table) = qualified.split_once('.').unwrap_or(("public", *qualified));
                vec![
                    Field::String(schema.to_string()),
                    Field::String(table.to_string()),
                ]
            })
            .collect();
        self.with_statement(
            "information_schema.tables",
            StatementScript::rows(&["table_schema", "table_name"], rows),
        )
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Returns the SQL of every execute call received so far.
    pub fn executed_sql(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Execute(input) => Some(input.sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of describe calls received so far.
    pub fn describe_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Describe(_)))
    }

    /// Number of result-page fetches received so far.
    pub fn result_fetch_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::GetResult { .. }))
    }

    fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the calls recorded so far.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn page_token(statement_id: &str, index: usize) -> String {
    format!("{statement_id}/page-{index}")
}

fn page_index(statement_id: &str, token: Option<&str>) -> Result<usize> {
    let Some(token) = token else {
        return Ok(0);
    };
    token
        .strip_prefix(statement_id)
        .and_then(|rest| rest.strip_prefix("/page-"))
        .and_then(|index| index.parse().ok())
        .ok_or_else(|| ConnectorError::api(format!("Invalid NextToken '{token}'")))
}

#[async_trait]
impl DataApi for MockDataApi {
    async fn execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput> {
        let mut state = self.lock();
        state.calls.push(MockCall::Execute(input.clone()));

        let sql = input.sql.to_lowercase();
        let script = state
            .scripts
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, script)| script.clone())
            .ok_or_else(|| {
                ConnectorError::submission(format!("No scripted response for: {}", input.sql))
            })?;

        if let Some(message) = &script.rejection {
            return Err(ConnectorError::submission(message.clone()));
        }

        state.next_id += 1;
        let id = format!("stmt-{}", state.next_id);
        state.running.insert(
            id.clone(),
            RunningStatement {
                script,
                describes: 0,
            },
        );

        Ok(ExecuteStatementOutput { id })
    }

    async fn describe_statement(&self, statement_id: &str) -> Result<DescribeStatementOutput> {
        let mut state = self.lock();
        state
            .calls
            .push(MockCall::Describe(statement_id.to_string()));

        let running = state
            .running
            .get_mut(statement_id)
            .ok_or_else(|| ConnectorError::api(format!("Unknown statement {statement_id}")))?;

        let statuses = &running.script.statuses;
        let status = statuses
            .get(running.describes)
            .or_else(|| statuses.last())
            .copied()
            .unwrap_or(StatementStatus::Finished);
        running.describes += 1;

        let error = match status {
            StatementStatus::Failed => running.script.error.clone(),
            _ => None,
        };

        Ok(DescribeStatementOutput {
            id: statement_id.to_string(),
            status,
            error,
        })
    }

    async fn get_statement_result(
        &self,
        statement_id: &str,
        next_token: Option<&str>,
    ) -> Result<GetStatementResultOutput> {
        let mut state = self.lock();
        state.calls.push(MockCall::GetResult {
            statement_id: statement_id.to_string(),
            next_token: next_token.map(String::from),
        });

        let running = state
            .running
            .get(statement_id)
            .ok_or_else(|| ConnectorError::api(format!("Unknown statement {statement_id}")))?;

        let index = page_index(statement_id, next_token)?;
        if let Some((failing, message)) = &running.script.page_failure {
            if *failing == index {
                return Err(ConnectorError::api(format!(
                    "Failed to get statement results: {message}"
                )));
            }
        }

        let pages = &running.script.pages;
        let mut page = pages.get(index).cloned().unwrap_or_default();
        if index + 1 < pages.len() {
            page.next_token = Some(page_token(statement_id, index + 1));
        }
        Ok(page)
    }
}
