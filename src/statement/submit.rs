//! Statement submission.

use tracing::{debug, info};

use crate::config::ConnectionIdentity;
use crate::data_api::{DataApi, ExecuteStatementInput, Target};
use crate::error::{ConnectorError, Result};

/// Opaque handle to a submitted statement.
///
/// Owned by one read; not cloneable so a handle is never shared between reads.
#[derive(Debug, PartialEq, Eq)]
pub struct StatementHandle {
    id: String,
}

impl StatementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The provider-assigned statement id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Builds the execute request for `sql`.
///
/// Exactly one target is forwarded. A secret reference takes precedence over
/// an explicit database user. A cluster target needs one of the two; a
/// workgroup may rely on the caller's IAM identity.
pub fn build_execute_input(identity: &ConnectionIdentity, sql: &str) -> Result<ExecuteStatementInput> {
    let mut input = ExecuteStatementInput {
        database: identity.database().to_string(),
        sql: sql.to_string(),
        ..Default::default()
    };

    match identity.target() {
        Target::Cluster(cluster) => {
            input.cluster_identifier = Some(cluster.clone());
            match (identity.secret_arn(), identity.db_user()) {
                (Some(secret), _) => input.secret_arn = Some(secret.to_string()),
                (None, Some(user)) => input.db_user = Some(user.to_string()),
                (None, None) => {
                    return Err(ConnectorError::configuration(
                        "A cluster target requires 'secret_arn' or 'db_user' for database credentials",
                    ))
                }
            }
        }
        Target::Workgroup(workgroup) => {
            input.workgroup_name = Some(workgroup.clone());
            input.secret_arn = identity.secret_arn().map(String::from);
        }
    }

    Ok(input)
}

/// Submits `sql` for asynchronous execution and returns its handle.
///
/// Does not wait for the statement to run.
pub async fn submit(
    api: &dyn DataApi,
    identity: &ConnectionIdentity,
    sql: &str,
) -> Result<StatementHandle> {
    let input = build_execute_input(identity, sql)?;
    debug!(destination = %identity.target().describe(), sql_len = sql.len(), "Submitting statement");

    let output = api.execute_statement(input).await?;

    info!(statement_id = %output.id, "Statement submitted");
    Ok(StatementHandle::new(output.id))
}
