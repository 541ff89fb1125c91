//! Transport layer for the Redshift Data API.
//!
//! The statement protocol only needs three calls, so the seam is a small
//! trait: the SDK adapter talks to AWS, the mock replays scripted responses.

mod mock;
mod sdk;
mod types;

pub use mock::{MockCall, MockDataApi, StatementScript};
pub use sdk::{SdkDataApi, SdkDataApiConfig};
pub use types::{
    ColumnMetadata, Credentials, DescribeStatementOutput, ExecuteStatementInput,
    ExecuteStatementOutput, Field, GetStatementResultOutput, StatementStatus, Target,
};

use crate::error::Result;
use async_trait::async_trait;

/// The subset of the Redshift Data API used by the statement protocol.
///
/// Implementations must map a rejected execute call to
/// `ConnectorError::Submission` and failed describe/result calls to
/// `ConnectorError::Api`, carrying the provider message verbatim.
#[async_trait]
pub trait DataApi: Send + Sync {
    /// Submits a statement for asynchronous execution.
    async fn execute_statement(&self, input: ExecuteStatementInput)
        -> Result<ExecuteStatementOutput>;

    /// Fetches the current status of a statement.
    async fn describe_statement(&self, statement_id: &str) -> Result<DescribeStatementOutput>;

    /// Fetches one page of results; `next_token` is `None` for the first page.
    async fn get_statement_result(
        &self,
        statement_id: &str,
        next_token: Option<&str>,
    ) -> Result<GetStatementResultOutput>;
}
