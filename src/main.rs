//! redshift-source - read Amazon Redshift table snapshots from the command line.

mod cli;

use anyhow::Context;
use cli::{Cli, Command};
use futures::StreamExt;
use redshift_source::config::{Config, ConnectorOptions, ConnectorSettings};
use redshift_source::error::{ConnectorError, Result};
use redshift_source::logging;
use redshift_source::source::{Offset, RedshiftConnector, SourceConnector, TableName};
use std::io::{BufWriter, Write};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ConnectorError>() {
            Some(err) => error!("{}: {}", err.category(), err),
            None => error!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let options = resolve_options(&cli, &config)?;
    let settings = ConnectorSettings::from_options(&options)?;
    let connector = RedshiftConnector::connect(settings).await?;

    let mut out = BufWriter::new(std::io::stdout());

    match &cli.command {
        Command::Tables => {
            for table in connector.list_tables().await? {
                writeln!(out, "{table}")?;
            }
        }
        Command::Schema { table } => {
            let options = config.table_options(&table_key(table));
            let schema = connector.get_table_schema(table, &options).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&schema)?)?;
        }
        Command::Metadata { table } => {
            let options = config.table_options(&table_key(table));
            let metadata = connector.read_table_metadata(table, &options).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&metadata)?)?;
        }
        Command::Read { table, .. } => {
            let mut options = config.table_options(&table_key(table));
            options.merge(&cli.command.table_options());

            let (mut records, offset) = connector
                .read_table(table, &Offset::new(), &options)
                .await?;

            let mut count = 0usize;
            while let Some(record) = records.next().await {
                let record = record?;
                serde_json::to_writer(&mut out, &record).context("Failed to write record")?;
                out.write_all(b"\n")?;
                count += 1;
            }
            info!(rows = count, offset = ?offset, "Snapshot complete");
        }
    }

    out.flush()?;
    Ok(())
}

/// Key of a table in the `[tables]` config section.
///
/// Unparseable names are passed through so the connector reports them.
fn table_key(table: &str) -> String {
    TableName::parse(table)
        .map(|name| name.qualified())
        .unwrap_or_else(|_| table.to_string())
}

/// Resolves connection options with precedence:
/// 1. `-o` overrides (highest)
/// 2. Named or default source from the config file
/// 3. AWS environment variables
fn resolve_options(cli: &Cli, config: &Config) -> Result<ConnectorOptions> {
    let mut options = match cli.source_name() {
        Some(name) => config.get_source(Some(name)).cloned().ok_or_else(|| {
            ConnectorError::configuration(format!("Source '{name}' not found in config file"))
        })?,
        None => config.get_source(None).cloned().unwrap_or_default(),
    };

    options.merge(&cli.option_overrides());
    options.apply_env_defaults();
    Ok(options)
}
