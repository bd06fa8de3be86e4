//! Schema reconciliation for multi-source CDC table sync.
//!
//! This binary discovers the source tables feeding one destination table,
//! merges their schemas and creates or validates the destination table. It
//! can also replay recorded schema change events against that table.
//!
//! # Safety Guarantees
//! - Source databases are only read
//! - Column types only ever widen
//! - No credentials logged or persisted

use cdcsync::cli::{Cli, Command};
use cdcsync::commands;
use cdcsync::output::{render_plan, render_report};
use cdcsync_core::Result;
use cdcsync_core::logging::init_logging;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)?;

    match &cli.command {
        Command::SyncTable(args) => {
            let plan = commands::sync_table(args).await?;
            print!("{}", render_plan(&plan, args.format)?);
        }
        Command::Replay(args) => {
            let report = commands::replay(args).await?;
            print!("{}", render_report(&report, args.format)?);
        }
        Command::CheckChange(args) => {
            let decision = commands::check_change(&args.from, &args.to)?;
            println!(
                "{}",
                commands::describe_decision(&args.from, &args.to, &decision)
            );
        }
        Command::Test(args) => {
            println!("{}", commands::test_connection(&args.source).await?);
        }
        Command::ListTypes => print!("{}", commands::list_types()),
    }

    Ok(())
}
