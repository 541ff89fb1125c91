//! Completion polling.
//!
//! Fixed-interval polling with an attempt budget. A timeout abandons local
//! polling only; the remote statement keeps running.

use std::time::Duration;
use tracing::{debug, warn};

use super::submit::StatementHandle;
use crate::data_api::{DataApi, DescribeStatementOutput, StatementStatus};
use crate::error::{ConnectorError, Result};

/// Default seconds between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default attempt budget (about ten minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Waits until the statement reaches a terminal state.
///
/// Performs at most `max_attempts` status queries with one sleep between
/// consecutive queries. FINISHED returns the final description; FAILED and
/// ABORTED return `QueryFailed`; an exhausted budget returns `QueryTimeout`.
pub async fn wait_for_completion(
    api: &dyn DataApi,
    handle: &StatementHandle,
    config: PollConfig,
) -> Result<DescribeStatementOutput> {
    for attempt in 1..=config.max_attempts {
        let description = api.describe_statement(handle.id()).await?;

        match description.status {
            StatementStatus::Finished => {
                debug!(statement_id = handle.id(), attempt, "Statement finished");
                return Ok(description);
            }
            StatementStatus::Failed => {
                let detail = description
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string());
                return Err(ConnectorError::query_failed(detail));
            }
            StatementStatus::Aborted => {
                let detail = description
                    .error
                    .unwrap_or_else(|| "SQL statement was aborted".to_string());
                return Err(ConnectorError::query_failed(detail));
            }
            status => {
                debug!(
                    statement_id = handle.id(),
                    attempt,
                    status = status.as_str(),
                    "Statement still running"
                );
                if attempt < config.max_attempts {
                    tokio::time::sleep(config.interval).await;
                }
            }
        }
    }

    warn!(
        statement_id = handle.id(),
        attempts = config.max_attempts,
        "Polling budget exhausted; statement left running"
    );
    Err(ConnectorError::query_timeout(
        handle.id(),
        config.max_attempts,
    ))
}
