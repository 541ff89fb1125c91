//! Ingestion source interface.
//!
//! The pipeline drives every source through [`SourceConnector`]; Redshift is
//! the one implementation.

pub mod catalog;
mod redshift;
mod schema;

pub use redshift::{build_select_sql, RedshiftConnector};
pub use schema::{
    quote_identifier, quote_literal, IngestionType, LogicalType, SchemaField, TableMetadata,
    TableName, TableSchema,
};

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::config::TableOptions;
use crate::error::Result;
use crate::statement::RecordStream;

/// Resume marker exchanged with the pipeline.
///
/// Snapshot reads ignore the incoming offset and always return an empty one,
/// meaning "snapshot complete, nothing to resume".
pub type Offset = BTreeMap<String, String>;

/// Capabilities a source offers to the ingestion pipeline.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Lists readable tables as `schema.table`.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Returns the column schema of a table.
    async fn get_table_schema(&self, table: &str, options: &TableOptions) -> Result<TableSchema>;

    /// Returns primary keys and ingestion type of a table.
    async fn read_table_metadata(
        &self,
        table: &str,
        options: &TableOptions,
    ) -> Result<TableMetadata>;

    /// Reads a full snapshot of a table.
    ///
    /// Returns a lazy row stream and the offset to store for the next read.
    async fn read_table(
        &self,
        table: &str,
        prior_offset: &Offset,
        options: &TableOptions,
    ) -> Result<(RecordStream, Offset)>;
}
