//! Redshift source: table discovery and snapshot reads over the Data API.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::catalog;
use super::schema::{IngestionType, TableMetadata, TableName, TableSchema};
use super::{Offset, SourceConnector};
use crate::config::{ConnectorSettings, TableOptions};
use crate::data_api::{DataApi, SdkDataApi, SdkDataApiConfig};
use crate::error::{ConnectorError, Result};
use crate::statement::{RecordStream, StatementExecutor};

/// Builds the snapshot query for a table.
///
/// The predicate is appended verbatim after `WHERE`; the configuration source
/// is trusted. A limit that is not a non-negative integer is ignored.
pub fn build_select_sql(table: &TableName, options: &TableOptions) -> String {
    let mut sql = format!("SELECT * FROM {}", table.quoted());

    if let Some(clause) = options.where_clause.as_deref().map(str::trim) {
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
    }

    if let Some(raw) = options.limit.as_deref() {
        match raw.trim().parse::<u64>() {
            Ok(limit) => sql.push_str(&format!(" LIMIT {limit}")),
            Err(_) => warn!(limit = raw, "Ignoring non-numeric row limit"),
        }
    }

    sql
}

/// Redshift implementation of [`SourceConnector`].
pub struct RedshiftConnector {
    executor: StatementExecutor,
    schema_filter: Option<Vec<String>>,
}

impl RedshiftConnector {
    /// Creates a connector over an existing Data API transport.
    pub fn new(api: Arc<dyn DataApi>, settings: ConnectorSettings) -> Self {
        let executor = StatementExecutor::new(api, Arc::new(settings.identity), settings.poll);
        Self {
            executor,
            schema_filter: settings.schema_filter,
        }
    }

    /// Creates a connector talking to AWS through the SDK.
    ///
    /// Static credentials from the settings win; otherwise the default
    /// credential chain is used.
    pub async fn connect(settings: ConnectorSettings) -> Result<Self> {
        let mut config = SdkDataApiConfig::new(settings.identity.region());
        if let Some(credentials) = settings.identity.credentials() {
            config = config.with_credentials(credentials.clone());
        }
        if let Some(endpoint) = &settings.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        let api = SdkDataApi::connect(config).await?;

        info!("Connecting to {}", settings.identity.display_string());
        Ok(Self::new(Arc::new(api), settings))
    }

    /// Resolves a table name and checks it against discovery.
    ///
    /// A name that does not parse can never be discovered, so it is reported
    /// like any other unknown table.
    async fn resolve_table(&self, table: &str) -> Result<TableName> {
        let known = self.list_tables().await?;
        match TableName::parse(table) {
            Ok(name) if known.contains(&name.qualified()) => Ok(name),
            _ => Err(ConnectorError::not_found(table, &known)),
        }
    }
}

#[async_trait]
impl SourceConnector for RedshiftConnector {
    async fn list_tables(&self) -> Result<Vec<String>> {
        catalog::list_tables(&self.executor, self.schema_filter.as_deref()).await
    }

    async fn get_table_schema(&self, table: &str, _options: &TableOptions) -> Result<TableSchema> {
        let name = self.resolve_table(table).await?;
        catalog::table_schema(&self.executor, &name).await
    }

    async fn read_table_metadata(
        &self,
        table: &str,
        _options: &TableOptions,
    ) -> Result<TableMetadata> {
        let name = self.resolve_table(table).await?;
        let primary_keys = catalog::primary_keys(&self.executor, &name).await?;
        Ok(TableMetadata {
            primary_keys,
            ingestion_type: IngestionType::Snapshot,
        })
    }

    async fn read_table(
        &self,
        table: &str,
        _prior_offset: &Offset,
        options: &TableOptions,
    ) -> Result<(RecordStream, Offset)> {
        let name = self.resolve_table(table).await?;
        let sql = build_select_sql(&name, options);
        info!(table = %name, "Reading table snapshot");

        let records = self.executor.execute(&sql).await?;
        Ok((records, Offset::new()))
    }
}
