//! Configuration management for the Redshift source.
//!
//! Connection options arrive as a flat string map (from a TOML file, the
//! CLI or an embedding pipeline). They are validated once into an immutable
//! [`ConnectionIdentity`] plus the polling and discovery settings.

use crate::data_api::{Credentials, Target};
use crate::error::{ConnectorError, Result};
use crate::statement::{PollConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Flat option map, as handed over by the pipeline.
///
/// TOML integers and booleans are accepted and kept as their string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorOptions {
    values: BTreeMap<String, String>,
}

impl ConnectorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from key/value pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut options = Self::new();
        for (key, value) in pairs {
            options.set(*key, *value);
        }
        options
    }

    /// Returns a trimmed, non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Sets `key` only if it has no value yet.
    pub fn set_default(&mut self, key: &str, value: Option<String>) {
        if self.get(key).is_none() {
            if let Some(value) = value {
                self.set(key, value);
            }
        }
    }

    /// Merges another option map into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ConnectorOptions) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Fills `region` from the AWS environment variables.
    ///
    /// Credentials are left to the SDK's default chain.
    pub fn apply_env_defaults(&mut self) {
        self.set_default(
            "region",
            std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok(),
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for ConnectorOptions {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl<'de> Deserialize<'de> for ConnectorOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, OptionValue>::deserialize(deserializer)?;
        let values = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    OptionValue::Text(s) => s,
                    OptionValue::Integer(i) => i.to_string(),
                    OptionValue::Bool(b) => b.to_string(),
                };
                (key, value)
            })
            .collect();
        Ok(Self { values })
    }
}

/// Validated, immutable identity of the database every read talks to.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    region: String,
    database: String,
    target: Target,
    db_user: Option<String>,
    secret_arn: Option<String>,
    credentials: Option<Credentials>,
}

impl ConnectionIdentity {
    /// Validates connection options.
    ///
    /// Requires `region`, `database` and exactly one of `cluster_identifier`
    /// or `workgroup_name`. A cluster additionally needs `secret_arn` or
    /// `db_user`. Static credentials must come as a complete pair.
    pub fn from_options(options: &ConnectorOptions) -> Result<Self> {
        let region = options.get("region").ok_or_else(|| {
            ConnectorError::configuration("Redshift connector requires 'region' in options")
        })?;
        let database = options.get("database").ok_or_else(|| {
            ConnectorError::configuration("Redshift connector requires 'database' in options")
        })?;

        let target = match (options.get("cluster_identifier"), options.get("workgroup_name")) {
            (Some(cluster), None) => Target::Cluster(cluster.to_string()),
            (None, Some(workgroup)) => Target::Workgroup(workgroup.to_string()),
            (None, None) => {
                return Err(ConnectorError::configuration(
                    "Redshift connector requires either 'cluster_identifier' or 'workgroup_name'",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ConnectorError::configuration(
                    "Redshift connector cannot specify both 'cluster_identifier' and 'workgroup_name'",
                ))
            }
        };

        let credentials = match (
            options.get("access_key_id"),
            options.get("secret_access_key"),
            options.get("session_token"),
        ) {
            (Some(key), Some(secret), token) => {
                let credentials = Credentials::new(key, secret);
                Some(match token {
                    Some(token) => credentials.with_session_token(token),
                    None => credentials,
                })
            }
            (None, None, None) => None,
            _ => {
                return Err(ConnectorError::configuration(
                    "'access_key_id' and 'secret_access_key' must be given together",
                ))
            }
        };

        let identity = Self {
            region: region.to_string(),
            database: database.to_string(),
            target,
            db_user: options.get("db_user").map(String::from),
            secret_arn: options.get("secret_arn").map(String::from),
            credentials,
        };

        if matches!(identity.target, Target::Cluster(_))
            && identity.secret_arn.is_none()
            && identity.db_user.is_none()
        {
            return Err(ConnectorError::configuration(
                "A cluster target requires 'secret_arn' or 'db_user' for database credentials",
            ));
        }

        Ok(identity)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn db_user(&self) -> Option<&str> {
        self.db_user.as_deref()
    }

    pub fn secret_arn(&self) -> Option<&str> {
        self.secret_arn.as_deref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns a display-safe string (no secrets) for logs.
    pub fn display_string(&self) -> String {
        format!("{} @ {} ({})", self.database, self.target.describe(), self.region)
    }
}

impl fmt::Debug for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionIdentity")
            .field("region", &self.region)
            .field("database", &self.database)
            .field("target", &self.target)
            .field("db_user", &self.db_user)
            .field("secret_arn", &self.secret_arn)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Everything the connector needs besides the transport.
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    pub identity: ConnectionIdentity,
    pub poll: PollConfig,
    /// Schemas to include in discovery; `None` means all non-system schemas.
    pub schema_filter: Option<Vec<String>>,
    /// Data API endpoint override.
    pub endpoint: Option<String>,
}

impl ConnectorSettings {
    pub fn from_options(options: &ConnectorOptions) -> Result<Self> {
        let identity = ConnectionIdentity::from_options(options)?;

        let interval = parse_number::<u64>(options, "poll_interval", DEFAULT_POLL_INTERVAL_SECS)?;
        let max_attempts =
            parse_number::<u32>(options, "max_poll_attempts", DEFAULT_MAX_POLL_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConnectorError::configuration(
                "'max_poll_attempts' must be at least 1",
            ));
        }

        Ok(Self {
            identity,
            poll: PollConfig {
                interval: Duration::from_secs(interval),
                max_attempts,
            },
            schema_filter: parse_schema_filter(options.get("schema_filter").unwrap_or("")),
            endpoint: options.get("endpoint").map(String::from),
        })
    }
}

fn parse_number<T: std::str::FromStr>(options: &ConnectorOptions, key: &str, default: T) -> Result<T> {
    match options.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            ConnectorError::configuration(format!(
                "'{key}' must be a non-negative integer, got '{raw}'"
            ))
        }),
    }
}

/// Parses a comma-separated schema list; blank entries are dropped.
pub fn parse_schema_filter(raw: &str) -> Option<Vec<String>> {
    let schemas: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if schemas.is_empty() {
        None
    } else {
        Some(schemas)
    }
}

/// Per-table read options. Both are optional and only ever add to the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Row limit; ignored unless it parses as an integer.
    pub limit: Option<String>,
    /// Predicate appended verbatim after `WHERE`.
    pub where_clause: Option<String>,
}

impl TableOptions {
    pub fn from_options(options: &ConnectorOptions) -> Self {
        Self {
            limit: options.get("limit").map(String::from),
            where_clause: options.get("where_clause").map(String::from),
        }
    }

    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn with_where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Merges another set of options into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &TableOptions) {
        if other.limit.is_some() {
            self.limit = other.limit.clone();
        }
        if other.where_clause.is_some() {
            self.where_clause = other.where_clause.clone();
        }
    }
}

/// Main configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Named sources, each a flat option map.
    #[serde(default)]
    pub sources: HashMap<String, ConnectorOptions>,

    /// Per-table options keyed by `schema.table`.
    #[serde(default)]
    pub tables: HashMap<String, ConnectorOptions>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("redshift-source")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields an empty config.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::configuration(format!("Failed to read config file: {e}"))
        })?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ConnectorError::configuration(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named source, or the default source if name is None.
    pub fn get_source(&self, name: Option<&str>) -> Option<&ConnectorOptions> {
        self.sources.get(name.unwrap_or("default"))
    }

    /// Returns the configured options for a table, empty if none.
    pub fn table_options(&self, table: &str) -> TableOptions {
        self.tables
            .get(table)
            .map(TableOptions::from_options)
            .unwrap_or_default()
    }
}
