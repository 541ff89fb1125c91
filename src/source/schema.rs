//! Table schema types and the Redshift type mapping.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{ConnectorError, Result};

/// Default precision for NUMERIC/DECIMAL columns without one.
const DEFAULT_DECIMAL_PRECISION: u32 = 18;

/// Logical column type handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Long,
    Decimal { precision: u32, scale: u32 },
    Float,
    Double,
    Boolean,
    String,
    Date,
    Timestamp,
    Binary,
}

impl LogicalType {
    /// Maps a Redshift type name to its logical type.
    ///
    /// Integers of every width widen to `Long`. Types without a natural
    /// counterpart (time, interval, super, spatial, sketches) and anything
    /// unknown map to `String`.
    pub fn from_redshift(type_name: &str, precision: Option<i64>, scale: Option<i64>) -> Self {
        match type_name.trim().to_lowercase().as_str() {
            "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" => Self::Long,
            "numeric" | "decimal" => Self::Decimal {
                precision: precision
                    .and_then(|p| u32::try_from(p).ok())
                    .unwrap_or(DEFAULT_DECIMAL_PRECISION),
                scale: scale.and_then(|s| u32::try_from(s).ok()).unwrap_or(0),
            },
            "real" | "float4" => Self::Float,
            "double precision" | "float8" | "float" => Self::Double,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "timestamp"
            | "timestamp without time zone"
            | "timestamptz"
            | "timestamp with time zone" => Self::Timestamp,
            "varbyte" => Self::Binary,
            _ => Self::String,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::Date => write!(f, "date"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

impl Serialize for LogicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub data_type: LogicalType,
    pub nullable: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, data_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Columns of a table in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How the pipeline should ingest a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionType {
    /// Every read is a full, independent snapshot.
    Snapshot,
}

/// Table-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    /// Primary key columns in key order; empty if none is declared.
    pub primary_keys: Vec<String>,
    pub ingestion_type: IngestionType,
}

/// A schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    /// Parses `schema.table`, or a bare `table` in the `public` schema.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let (schema, table) = name.split_once('.').unwrap_or(("public", name));
        if schema.is_empty() || table.is_empty() {
            return Err(ConnectorError::configuration(format!(
                "Invalid table name '{name}'"
            )));
        }
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// `schema.table`, as listed by discovery.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// `"schema"."table"`, safe to splice into SQL.
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.table)
        )
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Quotes an identifier, doubling embedded double quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
