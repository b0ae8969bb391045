//! Core CLI definitions

use clap::{Args, Parser, Subcommand};
use dnt::UnknownTagPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dnt")]
#[command(about = "DNT table converter", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also append log output to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert DNT tables to CSV
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Show the header and column directory of a DNT table
    #[command(visible_alias = "i")]
    Inspect {
        /// Path to .dnt file
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a message from the catalog
    #[command(visible_alias = "l")]
    Lookup {
        /// Message id
        #[arg(allow_negative_numbers = true)]
        id: i32,

        /// Values for {0}, {1}, ... placeholders
        params: Vec<String>,

        /// Bracketed message id list used as parameters, e.g. "{12}^{34}"
        #[arg(long, conflicts_with = "params")]
        bracketed: Option<String>,

        /// Catalog XML file or directory containing uistring.xml
        #[arg(long, env = "DNT_CATALOG")]
        catalog: Option<PathBuf>,
    },

    /// Configure default settings
    Configure {
        /// Set default catalog path
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Set default output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Set default resolvable columns (repeatable)
        #[arg(long = "resolve-column", value_name = "NAME")]
        resolve_columns: Vec<String>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// A .dnt file or a directory of .dnt files
    pub input: PathBuf,

    /// Output directory for .csv files [default: output]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Catalog XML file or directory containing uistring.xml
    #[arg(long, env = "DNT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Column resolved through the catalog (repeatable; replaces the defaults)
    #[arg(long = "resolve-column", value_name = "NAME")]
    pub resolve_columns: Vec<String>,

    /// Write every message id as a number
    #[arg(long, conflicts_with = "resolve_columns")]
    pub no_resolve: bool,

    /// Unknown column types: placeholder, skip:<bytes> or reject
    #[arg(long, value_parser = parse_unknown_tag, default_value = "placeholder")]
    pub unknown_tag: UnknownTagPolicy,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Print the conversion report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse_unknown_tag(s: &str) -> Result<UnknownTagPolicy, String> {
    match s {
        "placeholder" => Ok(UnknownTagPolicy::Placeholder),
        "reject" => Ok(UnknownTagPolicy::Reject),
        _ => match s.strip_prefix("skip:") {
            Some(width) => width
                .parse::<usize>()
                .map(UnknownTagPolicy::Skip)
                .map_err(|_| format!("invalid byte count in '{}'", s)),
            None => Err(format!(
                "expected placeholder, skip:<bytes> or reject, got '{}'",
                s
            )),
        },
    }
}
