//! Redshift Data API client backed by the AWS SDK.
//!
//! A thin adapter: region, endpoint override and credentials go into the
//! SDK config, and SDK shapes are converted to the protocol types at the
//! boundary.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_redshiftdata::config::Region;
use aws_sdk_redshiftdata::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_redshiftdata::types as sdk;
use aws_sdk_redshiftdata::Client;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::{
    ColumnMetadata, Credentials, DescribeStatementOutput, ExecuteStatementInput,
    ExecuteStatementOutput, Field, GetStatementResultOutput, StatementStatus,
};
use super::DataApi;
use crate::error::{ConnectorError, Result};

/// Default timeout for a single API operation, retries included.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per API call.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Provider name attached to static credentials.
const CREDENTIALS_PROVIDER: &str = "redshift-source";

/// SDK client configuration.
#[derive(Debug, Clone)]
pub struct SdkDataApiConfig {
    pub region: String,
    /// Static credentials; the default credential chain is used when unset.
    pub credentials: Option<Credentials>,
    /// Endpoint override (e.g. a local stand-in); defaults to the regional endpoint.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl SdkDataApiConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Uses static credentials instead of the default chain.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets an endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the operation timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the number of attempts per call (1 disables retries).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the validated endpoint override, if any.
    pub fn endpoint_url(&self) -> Result<Option<Url>> {
        let Some(raw) = &self.endpoint else {
            return Ok(None);
        };
        let url = Url::parse(raw)
            .map_err(|e| ConnectorError::configuration(format!("Invalid endpoint '{raw}': {e}")))?;
        if url.host_str().is_none() {
            return Err(ConnectorError::configuration(format!(
                "Endpoint '{raw}' has no host"
            )));
        }
        Ok(Some(url))
    }
}

/// Redshift Data API client.
#[derive(Debug, Clone)]
pub struct SdkDataApi {
    client: Client,
}

/// Which call is being made; decides how failures are classified.
#[derive(Debug, Clone, Copy)]
enum Operation {
    ExecuteStatement,
    DescribeStatement,
    GetStatementResult,
}

impl Operation {
    fn error(&self, msg: String) -> ConnectorError {
        match self {
            Self::ExecuteStatement => ConnectorError::submission(msg),
            Self::DescribeStatement => {
                ConnectorError::api(format!("Failed to describe statement: {msg}"))
            }
            Self::GetStatementResult => {
                ConnectorError::api(format!("Failed to get statement results: {msg}"))
            }
        }
    }

    fn sdk_error<E, R>(&self, err: SdkError<E, R>) -> ConnectorError
    where
        E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
        R: fmt::Debug,
    {
        self.error(sdk_message(&err))
    }
}

/// Extracts the provider message from an SDK error.
///
/// Service errors keep their `Code: message` form; transport failures fall
/// back to the full error chain.
fn sdk_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: fmt::Debug,
{
    if let Some(service) = err.as_service_error() {
        match (service.code(), service.message()) {
            (Some(code), Some(message)) => return format!("{code}: {message}"),
            (None, Some(message)) => return message.to_string(),
            (Some(code), None) => return code.to_string(),
            (None, None) => {}
        }
    }
    DisplayErrorContext(err).to_string()
}

impl SdkDataApi {
    /// Loads the SDK config and creates a client.
    ///
    /// Credentials are resolved lazily, so a missing credential chain only
    /// surfaces on the first call.
    pub async fn connect(config: SdkDataApiConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout_secs))
                    .build(),
            );
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint.as_str());
        }
        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(aws_sdk_redshiftdata::config::Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                credentials.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER,
            ));
        }

        let sdk_config = loader.load().await;
        debug!(
            "Data API client for region {} ({} credentials)",
            config.region,
            if config.credentials.is_some() { "static" } else { "default chain" }
        );
        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataApi for SdkDataApi {
    async fn execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput> {
        let output = self
            .client
            .execute_statement()
            .database(input.database)
            .sql(input.sql)
            .set_cluster_identifier(input.cluster_identifier)
            .set_workgroup_name(input.workgroup_name)
            .set_db_user(input.db_user)
            .set_secret_arn(input.secret_arn)
            .send()
            .await
            .map_err(|e| Operation::ExecuteStatement.sdk_error(e))?;

        let id = output
            .id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConnectorError::internal("ExecuteStatement returned no statement id"))?;
        Ok(ExecuteStatementOutput { id: id.to_string() })
    }

    async fn describe_statement(&self, statement_id: &str) -> Result<DescribeStatementOutput> {
        let output = self
            .client
            .describe_statement()
            .id(statement_id)
            .send()
            .await
            .map_err(|e| Operation::DescribeStatement.sdk_error(e))?;

        Ok(DescribeStatementOutput {
            id: statement_id.to_string(),
            status: output
                .status()
                .map_or(StatementStatus::Unknown, |s| StatementStatus::from_wire(s.as_str())),
            error: output.error().map(String::from),
        })
    }

    async fn get_statement_result(
        &self,
        statement_id: &str,
        next_token: Option<&str>,
    ) -> Result<GetStatementResultOutput> {
        let output = self
            .client
            .get_statement_result()
            .id(statement_id)
            .set_next_token(next_token.map(String::from))
            .send()
            .await
            .map_err(|e| Operation::GetStatementResult.sdk_error(e))?;

        Ok(result_page(
            output.records(),
            output.column_metadata(),
            output.next_token(),
        ))
    }
}

/// Converts one SDK result page.
fn result_page(
    records: &[Vec<sdk::Field>],
    columns: &[sdk::ColumnMetadata],
    next_token: Option<&str>,
) -> GetStatementResultOutput {
    GetStatementResultOutput {
        records: records
            .iter()
            .map(|row| row.iter().map(field).collect())
            .collect(),
        column_metadata: columns
            .iter()
            .map(|column| ColumnMetadata {
                name: column.name().unwrap_or_default().to_string(),
                type_name: column.type_name().map(String::from),
            })
            .collect(),
        next_token: next_token.map(String::from),
    }
}

/// Converts one SDK cell. Blobs go back to base64 text for the decoder.
fn field(value: &sdk::Field) -> Field {
    match value {
        sdk::Field::IsNull(true) => Field::Null,
        sdk::Field::BooleanValue(b) => Field::Boolean(*b),
        sdk::Field::LongValue(v) => Field::Long(*v),
        sdk::Field::DoubleValue(v) => Field::Double(*v),
        sdk::Field::StringValue(s) => Field::String(s.clone()),
        sdk::Field::BlobValue(blob) => Field::Blob(BASE64_STANDARD.encode(blob.as_ref())),
        _ => Field::Unknown,
    }
}
