//! Error types for the Redshift source.
//!
//! Every failure surfaced by a read, a catalog lookup or the CLI is one of
//! these variants. Nothing in the crate retries internally.

use thiserror::Error;

/// Maximum number of known tables listed in a `NotFound` hint.
pub const NOT_FOUND_HINT_LIMIT: usize = 10;

/// Main error type for connector operations.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Malformed or contradictory connection options (detected before any network call).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested table is not in the discovery list.
    #[error("Table '{table}' is not supported. Available tables: {}", format_hint(.available, .truncated))]
    NotFound {
        table: String,
        /// Up to `NOT_FOUND_HINT_LIMIT` known tables.
        available: Vec<String>,
        /// Whether more tables exist than are listed.
        truncated: bool,
    },

    /// The execute call was rejected by the provider.
    #[error("Failed to execute SQL statement: {0}")]
    Submission(String),

    /// The statement reached FAILED or ABORTED.
    #[error("SQL statement failed: {0}")]
    QueryFailed(String),

    /// The polling budget ran out while the statement was still running.
    #[error("Statement {statement_id} timed out after {attempts} polling attempts")]
    QueryTimeout { statement_id: String, attempts: u32 },

    /// A describe or result-fetch call failed at the transport or provider level.
    #[error("Data API error: {0}")]
    Api(String),

    /// Unexpected states (undecodable responses and the like).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_hint(available: &[String], truncated: &bool) -> String {
    let joined = available.join(", ");
    if *truncated {
        format!("{joined}...")
    } else {
        joined
    }
}

impl ConnectorError {
    /// Creates a configuration error with the given message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a not-found error, keeping at most `NOT_FOUND_HINT_LIMIT` known tables.
    pub fn not_found(table: impl Into<String>, known: &[String]) -> Self {
        Self::NotFound {
            table: table.into(),
            available: known.iter().take(NOT_FOUND_HINT_LIMIT).cloned().collect(),
            truncated: known.len() > NOT_FOUND_HINT_LIMIT,
        }
    }

    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a query-failed error with the given message.
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Creates a timeout error for the given statement.
    pub fn query_timeout(statement_id: impl Into<String>, attempts: u32) -> Self {
        Self::QueryTimeout {
            statement_id: statement_id.into(),
            attempts,
        }
    }

    /// Creates an API error with the given message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration Error",
            Self::NotFound { .. } => "Not Found",
            Self::Submission(_) => "Submission Error",
            Self::QueryFailed(_) => "Query Failed",
            Self::QueryTimeout { .. } => "Query Timeout",
            Self::Api(_) => "API Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ConnectorError.
pub type Result<T> = std::result::Result<T, ConnectorError>;
