//! Command-line argument parsing for the `redshift-source` binary.

use clap::{ArgAction, Parser, Subcommand};
use redshift_source::config::{Config, ConnectorOptions, TableOptions};
use std::path::PathBuf;

/// Reads table snapshots from Amazon Redshift through the Data API.
#[derive(Parser, Debug)]
#[command(name = "redshift-source")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use named source from config
    #[arg(short = 's', long, value_name = "NAME", global = true)]
    pub source: Option<String>,

    /// Override a connection option (repeatable)
    #[arg(
        short = 'o',
        long = "option",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        global = true
    )]
    pub options: Vec<(String, String)>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List readable tables
    Tables,

    /// Print the column schema of a table
    Schema {
        /// Table as schema.table (bare names are in public)
        table: String,
    },

    /// Print primary keys and ingestion type of a table
    Metadata {
        /// Table as schema.table (bare names are in public)
        table: String,
    },

    /// Read a table snapshot as JSON lines
    Read {
        /// Table as schema.table (bare names are in public)
        table: String,

        /// Maximum number of rows
        #[arg(long, value_name = "N")]
        limit: Option<u64>,

        /// Row filter appended after WHERE
        #[arg(long = "where", value_name = "CLAUSE")]
        where_clause: Option<String>,
    },
}

/// Parses a `key=value` pair. The value may itself contain `=`.
fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid option '{raw}'. Expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid option '{raw}'. Key must not be empty"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the named source to use, if specified.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the `-o` overrides as an option map.
    pub fn option_overrides(&self) -> ConnectorOptions {
        let mut options = ConnectorOptions::new();
        for (key, value) in &self.options {
            options.set(key.clone(), value.clone());
        }
        options
    }
}

impl Command {
    /// Table options given on the command line; empty for non-read commands.
    pub fn table_options(&self) -> TableOptions {
        match self {
            Self::Read {
                limit,
                where_clause,
                ..
            } => TableOptions {
                limit: limit.map(|n| n.to_string()),
                where_clause: where_clause.clone(),
            },
            _ => TableOptions::default(),
        }
    }
}
