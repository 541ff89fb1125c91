//! Catalog queries: table discovery, column schema and primary keys.
//!
//! Each lookup is a small information_schema query run through the same
//! statement protocol as table reads, buffered in full.

use tracing::debug;

use super::schema::{quote_literal, LogicalType, SchemaField, TableName, TableSchema};
use crate::error::{ConnectorError, Result};
use crate::statement::{Record, StatementExecutor, Value};

const SYSTEM_SCHEMAS: &str = "'pg_catalog', 'information_schema', 'pg_internal'";

/// SQL listing user tables and views, optionally restricted to some schemas.
pub fn list_tables_sql(schema_filter: Option<&[String]>) -> String {
    let filter_clause = match schema_filter {
        Some(schemas) if !schemas.is_empty() => {
            let list = schemas
                .iter()
                .map(|s| quote_literal(s))
                .collect::<Vec<_>>()
                .join(", ");
            format!(" AND table_schema IN ({list})")
        }
        _ => String::new(),
    };

    format!(
        "SELECT table_schema, table_name \
         FROM information_schema.tables \
         WHERE table_schema NOT IN ({SYSTEM_SCHEMAS}) \
         AND table_type IN ('BASE TABLE', 'VIEW'){filter_clause} \
         ORDER BY table_schema, table_name"
    )
}

/// SQL describing the columns of one table in ordinal order.
pub fn columns_sql(table: &TableName) -> String {
    format!(
        "SELECT column_name, data_type, is_nullable, character_maximum_length, \
         numeric_precision, numeric_scale, ordinal_position \
         FROM information_schema.columns \
         WHERE table_schema = {} AND table_name = {} \
         ORDER BY ordinal_position",
        quote_literal(&table.schema),
        quote_literal(&table.table)
    )
}

/// SQL listing the primary key columns of one table in key order.
pub fn primary_keys_sql(table: &TableName) -> String {
    format!(
        "SELECT kcu.column_name, kcu.ordinal_position \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
         ON tc.constraint_name = kcu.constraint_name \
         AND tc.table_schema = kcu.table_schema \
         AND tc.table_name = kcu.table_name \
         WHERE tc.constraint_type = 'PRIMARY KEY' \
         AND tc.table_schema = {} AND tc.table_name = {} \
         ORDER BY kcu.ordinal_position",
        quote_literal(&table.schema),
        quote_literal(&table.table)
    )
}

fn text(record: &Record, idx: usize) -> Option<&str> {
    record.values().get(idx).and_then(Value::as_str)
}

/// Integer cell; catalog numbers may arrive as longs or as text.
fn int(record: &Record, idx: usize) -> Option<i64> {
    match record.values().get(idx)? {
        Value::Int(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lists tables as `schema.table`, ordered by schema then table.
pub async fn list_tables(
    executor: &StatementExecutor,
    schema_filter: Option<&[String]>,
) -> Result<Vec<String>> {
    let records = executor.fetch_all(&list_tables_sql(schema_filter)).await?;

    let tables: Vec<String> = records
        .iter()
        .filter_map(|record| match (text(record, 0), text(record, 1)) {
            (Some(schema), Some(table)) if !schema.is_empty() && !table.is_empty() => {
                Some(format!("{schema}.{table}"))
            }
            _ => None,
        })
        .collect();

    debug!(count = tables.len(), "Discovered tables");
    Ok(tables)
}

/// Reads the column schema of a table. A table without columns is not found.
pub async fn table_schema(executor: &StatementExecutor, table: &TableName) -> Result<TableSchema> {
    let records = executor.fetch_all(&columns_sql(table)).await?;

    if records.is_empty() {
        return Err(ConnectorError::not_found(table.qualified(), &[]));
    }

    let fields = records
        .iter()
        .filter_map(|record| {
            let name = text(record, 0)?;
            let data_type = text(record, 1).unwrap_or("");
            // Unknown nullability is treated as nullable.
            let nullable = text(record, 2).map_or(true, |v| v.eq_ignore_ascii_case("YES"));
            let logical = LogicalType::from_redshift(data_type, int(record, 4), int(record, 5));
            Some(SchemaField::new(name, logical, nullable))
        })
        .collect();

    Ok(TableSchema { fields })
}

/// Reads the primary key columns of a table; empty when none is declared.
pub async fn primary_keys(executor: &StatementExecutor, table: &TableName) -> Result<Vec<String>> {
    let records = executor.fetch_all(&primary_keys_sql(table)).await?;

    Ok(records
        .iter()
        .filter_map(|record| text(record, 0).map(String::from))
        .collect())
}
