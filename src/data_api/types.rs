//! Protocol types for the Redshift Data API.
//!
//! The statement protocol and the mock speak these; the SDK adapter converts
//! to and from the AWS SDK shapes at the boundary.

use std::fmt;

/// Target of a statement: a provisioned cluster or a serverless workgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Provisioned cluster identifier.
    Cluster(String),
    /// Serverless workgroup name.
    Workgroup(String),
}

impl Target {
    /// Returns a short display form for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Cluster(id) => format!("cluster {id}"),
            Self::Workgroup(name) => format!("workgroup {name}"),
        }
    }
}

/// Static AWS credentials.
///
/// When none are configured the SDK's default credential chain is used.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Sets a session token for temporary credentials.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parameters of an `ExecuteStatement` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteStatementInput {
    pub database: String,
    pub sql: String,
    pub cluster_identifier: Option<String>,
    pub workgroup_name: Option<String>,
    pub db_user: Option<String>,
    pub secret_arn: Option<String>,
}

/// Response of an `ExecuteStatement` call.
#[derive(Debug, Clone)]
pub struct ExecuteStatementOutput {
    /// Statement handle used for polling and result retrieval.
    pub id: String,
}

/// Execution status reported by `DescribeStatement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementStatus {
    Submitted,
    /// The provider reports queued statements as `PICKED`.
    Queued,
    Started,
    Finished,
    Failed,
    Aborted,
    /// Any status this client does not know about (including `ALL`).
    Unknown,
}

impl StatementStatus {
    /// Parses the wire spelling of a status. Unknown spellings are non-terminal.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "SUBMITTED" => Self::Submitted,
            "PICKED" | "QUEUED" => Self::Queued,
            "STARTED" => Self::Started,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            "ABORTED" => Self::Aborted,
            _ => Self::Unknown,
        }
    }

    /// Returns true once no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }

    /// Returns the wire spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Queued => "PICKED",
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Response of a `DescribeStatement` call.
#[derive(Debug, Clone)]
pub struct DescribeStatementOutput {
    pub id: String,
    pub status: StatementStatus,
    /// Provider error detail, set when the statement failed.
    pub error: Option<String>,
}

/// Column metadata returned alongside each result page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: Option<String>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
        }
    }
}

/// One tagged cell of a result row.
///
/// A null flag wins over everything else. Blobs stay in their base64 wire
/// form until decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    /// Base64 text.
    Blob(String),
    /// A shape this client does not understand.
    Unknown,
}

/// Response of a `GetStatementResult` call: one page of rows.
#[derive(Debug, Clone, Default)]
pub struct GetStatementResultOutput {
    pub records: Vec<Vec<Field>>,
    pub column_metadata: Vec<ColumnMetadata>,
    /// Present iff more pages remain.
    pub next_token: Option<String>,
}

impl GetStatementResultOutput {
    /// Returns the continuation token, treating an empty string as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}
