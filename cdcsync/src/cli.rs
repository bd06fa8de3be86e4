//! Command-line argument definitions.

use crate::output::OutputFormat;
use cdcsync_core::config::{DiscoveryConfig, SyncConfig, parse_key_value};
use cdcsync_core::logging::LogFormat;
use cdcsync_core::matcher::MatcherKind;
use cdcsync_core::models::TableIdentifier;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cdcsync")]
#[command(about = "Schema reconciliation for multi-source CDC table sync")]
#[command(version)]
#[command(long_about = "
cdcsync - Schema reconciliation for multi-source CDC table sync

Many source tables (one per shard, for example) feed one destination table.
cdcsync discovers the source tables by pattern, merges their schemas along
a type-widening lattice, and creates or validates the destination table.

SAFETY:
- Source databases are only read (INFORMATION_SCHEMA, read-only sessions)
- Column types only ever widen; conflicting types abort before any write
- Credentials are redacted in logs and errors

SUPPORTED SOURCES:
- MySQL / MariaDB (mysql://)
- JSON snapshots (snapshot:<path> or *.json)

EXAMPLES:
  cdcsync sync-table --source mysql://cdc@db/ --warehouse /data/wh \\
      --database-pattern 'shop_\\d+' --table-pattern orders \\
      --target-database dw --target-table orders --primary-keys id
  cdcsync replay --warehouse /data/wh --target-database dw \\
      --target-table orders --events changes.jsonl
  cdcsync check-change --from 'int' --to 'bigint unsigned'
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover source tables, merge their schemas and create or validate the target table
    SyncTable(SyncTableArgs),
    /// Apply a recorded stream of schema change events to the target table
    Replay(ReplayArgs),
    /// Check whether a column type change would be applied
    CheckChange(CheckChangeArgs),
    /// Test the source connection
    Test(TestArgs),
    /// List supported MySQL types and their target types
    ListTypes,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logs except errors")]
    pub quiet: bool,

    /// Log format
    #[arg(long, global = true, default_value = "text", help = "Log format (text or json)")]
    pub log_format: LogFormat,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Source connection string
    #[arg(
        long,
        env = "SOURCE_DATABASE_URL",
        help = "Source connection string (mysql://... or snapshot:<path>)"
    )]
    pub source: String,

    /// Prompt for the source password
    #[arg(long, help = "Prompt for the source password instead of reading it from the URL")]
    pub password_prompt: bool,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Warehouse root directory
    #[arg(long, env = "CDCSYNC_WAREHOUSE", help = "Target catalog warehouse directory")]
    pub warehouse: PathBuf,

    /// Target database
    #[arg(long, help = "Target database name")]
    pub target_database: String,

    /// Target table
    #[arg(long, help = "Target table name")]
    pub target_table: String,
}

impl TargetArgs {
    pub fn identifier(&self) -> TableIdentifier {
        TableIdentifier::new(&self.target_database, &self.target_table)
    }
}

fn parse_table_option(argument: &str) -> Result<(String, String), String> {
    parse_key_value(argument).map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct SyncTableArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Source database pattern
    #[arg(long, default_value = ".*", help = "Pattern selecting source databases")]
    pub database_pattern: String,

    /// Source table pattern
    #[arg(long, default_value = ".*", help = "Pattern selecting source tables")]
    pub table_pattern: String,

    /// Pattern dialect
    #[arg(long, default_value = "regex", help = "Pattern dialect (regex, glob or exact)")]
    pub matcher: MatcherKind,

    /// Primary key columns
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated primary key columns (inferred when omitted)"
    )]
    pub primary_keys: Vec<String>,

    /// Partition key columns
    #[arg(long, value_delimiter = ',', help = "Comma-separated partition key columns")]
    pub partition_keys: Vec<String>,

    /// Table options
    #[arg(
        long = "table-option",
        value_name = "KEY=VALUE",
        value_parser = parse_table_option,
        help = "Target table option (repeatable)"
    )]
    pub table_options: Vec<(String, String)>,

    /// Concurrent describe calls
    #[arg(long, default_value = "4", help = "Maximum concurrent source metadata queries")]
    pub max_concurrency: usize,

    /// Include system databases
    #[arg(long, help = "Match system databases as well")]
    pub include_system: bool,

    /// Plan only
    #[arg(long, help = "Report the plan without touching the target catalog")]
    pub dry_run: bool,

    /// Plan output file
    #[arg(short, long, help = "Also write the plan as JSON to this file")]
    pub output: Option<PathBuf>,

    /// Result format
    #[arg(long, default_value = "text", help = "Result format (text or json)")]
    pub format: OutputFormat,
}

impl SyncTableArgs {
    /// Builds the planner config from the parsed flags.
    pub fn sync_config(&self) -> SyncConfig {
        let discovery = DiscoveryConfig::new(&self.database_pattern, &self.table_pattern)
            .with_matcher(self.matcher)
            .with_max_concurrency(self.max_concurrency)
            .with_include_system(self.include_system);

        let mut config = SyncConfig::new(discovery, self.target.identifier())
            .with_primary_keys(self.primary_keys.clone())
            .with_partition_keys(self.partition_keys.clone())
            .with_dry_run(self.dry_run);
        for (key, value) in &self.table_options {
            config = config.with_table_option(key, value);
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Event file
    #[arg(long, help = "JSON Lines file of schema change events")]
    pub events: PathBuf,

    /// Evaluate only
    #[arg(long, help = "Evaluate events without committing schema versions")]
    pub dry_run: bool,

    /// Result format
    #[arg(long, default_value = "text", help = "Result format (text or json)")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CheckChangeArgs {
    /// Current type
    #[arg(long, help = "Current column definition, e.g. 'int' or 'varchar(20)'")]
    pub from: String,

    /// Requested type
    #[arg(long, help = "Requested column definition")]
    pub to: String,
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}
