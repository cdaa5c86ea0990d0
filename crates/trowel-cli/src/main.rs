//! Trowel CLI - query and reconcile excavation records
//!
//! Thin command layer over `trowel-core` and its `SQLite` datastore.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::AppContext;
use crate::commands::conflicts::run_conflicts;
use crate::commands::find::{run_find, FindArgs};
use crate::commands::get::run_get;
use crate::commands::import::run_import;
use crate::commands::put::run_put;
use crate::commands::resolve::run_resolve;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let context = AppContext::open(cli.config, cli.db_path)?;

    match cli.command {
        Commands::Put { file, update } => run_put(&context, &file, update).await?,
        Commands::Find {
            text,
            category,
            constraints,
            recursive,
            exact,
            limit,
            json,
        } => {
            let args = FindArgs {
                text,
                category,
                constraints,
                recursive,
                exact,
                limit,
            };
            run_find(&context, &args, json).await?;
        }
        Commands::Get { id, revision } => run_get(&context, &id, revision.as_deref()).await?,
        Commands::Conflicts { json } => run_conflicts(&context, json).await?,
        Commands::Resolve {
            id,
            right,
            all_right,
        } => run_resolve(&context, &id, &right, all_right).await?,
        Commands::Import {
            file,
            overwrite_relations,
            json,
        } => run_import(&context, &file, overwrite_relations, json).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "trowel=debug" } else { "trowel=info" };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = default_directive.parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
