mod cli;
mod commands;
mod config;
mod file_utils;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Installed for the life of main; dropped with the guard
    let subscriber = logging::subscriber(cli.verbose, cli.log_file.as_deref())?;
    let _log_guard = tracing::subscriber::set_default(subscriber);

    run(cli.command, Config::load)
}

/// Dispatch a command; the config is only loaded by commands that read it
fn run<F>(command: Commands, load_config: F) -> Result<()>
where
    F: Fn() -> Result<Config>,
{
    match command {
        Commands::Convert(args) => {
            commands::convert::handle(args, &load_config()?)?;
        }

        Commands::Inspect { path, json } => {
            commands::inspect::inspect_file(&path, json)?;
        }

        Commands::Lookup {
            id,
            params,
            bracketed,
            catalog,
        } => {
            let catalog = match catalog {
                Some(path) => path,
                None => load_config()?.catalog.context(
                    "No catalog given; pass --catalog or run `dnt configure --catalog PATH`",
                )?,
            };
            commands::lookup::lookup(&catalog, id, &params, bracketed.as_deref())?;
        }

        Commands::Configure {
            catalog,
            output,
            resolve_columns,
            show,
        } => {
            commands::configure::handle(catalog, output, resolve_columns, show)?;
        }
    }

    Ok(())
}
