//! Table conversion command
//!
//! Loads the catalog once, then converts every input table. A table that
//! fails to decode is reported and skipped; the rest of the batch continues.

use anyhow::{bail, Context, Result};
use dnt::{
    output_path, ConversionOutput, Converter, DecodeOptions, ResolvePolicy, StringCatalog,
    DNT_EXTENSION,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cli::ConvertArgs;
use crate::config::Config;
use crate::file_utils::collect_inputs;

/// Default output directory name
const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Serialize)]
pub struct FailedTable {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub converted: Vec<ConversionOutput>,
    pub failed: Vec<FailedTable>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

pub fn handle(args: ConvertArgs, config: &Config) -> Result<()> {
    let catalog = load_catalog(args.catalog.as_deref().or(config.catalog.as_deref()))?;

    let options = DecodeOptions {
        resolve: resolve_policy(&args, config),
        unknown_tag: args.unknown_tag,
    };

    let output_dir = args
        .output
        .clone()
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let inputs = collect_inputs(&args.input, &[DNT_EXTENSION], args.recursive)?;
    if inputs.is_empty() {
        bail!("No .{} files found in {}", DNT_EXTENSION, args.input.display());
    }

    let converter = Converter::new(catalog.as_ref(), options);
    let report = convert_all(&converter, &inputs, &args.input, &output_dir);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &output_dir);
    }

    if !report.failed.is_empty() {
        bail!(
            "{} of {} tables failed to convert",
            report.failed.len(),
            report.total()
        );
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<Option<StringCatalog>> {
    let Some(path) = path else {
        info!("No catalog given, message ids are written as numbers");
        return Ok(None);
    };

    let catalog = StringCatalog::load(path)
        .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
    Ok(Some(catalog))
}

/// Flags win over config; config wins over the built-in superset
pub fn resolve_policy(args: &ConvertArgs, config: &Config) -> ResolvePolicy {
    if args.no_resolve {
        ResolvePolicy::none()
    } else if !args.resolve_columns.is_empty() {
        ResolvePolicy::new(args.resolve_columns.iter().cloned())
    } else if let Some(columns) = &config.resolve_columns {
        ResolvePolicy::new(columns.iter().cloned())
    } else {
        ResolvePolicy::default()
    }
}

/// Convert every input, mirroring its directory below `input_root` under `output_dir`
///
/// An input whose output path was already written in this batch fails
/// instead of overwriting the earlier table.
pub fn convert_all(
    converter: &Converter<'_>,
    inputs: &[PathBuf],
    input_root: &Path,
    output_dir: &Path,
) -> BatchReport {
    let mut report = BatchReport::default();
    let mut written = HashSet::new();

    for input in inputs {
        match convert_one(converter, input, input_root, output_dir, &mut written) {
            Ok(converted) => report.converted.push(converted),
            Err(e) => {
                error!(input = %input.display(), error = %e, "Failed to convert table");
                report.failed.push(FailedTable {
                    input: input.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    report
}

fn convert_one(
    converter: &Converter<'_>,
    input: &Path,
    input_root: &Path,
    output_dir: &Path,
    written: &mut HashSet<PathBuf>,
) -> Result<ConversionOutput> {
    let target_dir = output_dir.join(relative_dir(input, input_root));
    let output = output_path(input, &target_dir)?;
    if !written.insert(output.clone()) {
        bail!("Output {} was already written by another input", output.display());
    }

    fs::create_dir_all(&target_dir)
        .with_context(|| format!("Failed to create output directory {}", target_dir.display()))?;
    Ok(converter.convert_file(input, &target_dir)?)
}

/// Directory of `input` relative to `input_root`; empty for a single file input
fn relative_dir<'a>(input: &'a Path, input_root: &Path) -> &'a Path {
    input
        .parent()
        .and_then(|parent| parent.strip_prefix(input_root).ok())
        .unwrap_or_else(|| Path::new(""))
}

fn print_report(report: &BatchReport, output_dir: &Path) {
    for converted in &report.converted {
        let summary = &converted.summary;
        println!(
            "Processed: {} -> {} ({} rows, {} columns)",
            converted.input.display(),
            converted.output.display(),
            summary.rows,
            summary.columns
        );
        if summary.skipped_cells > 0 || summary.unknown_cells > 0 {
            println!(
                "  {} skipped string cells, {} unknown cells",
                summary.skipped_cells, summary.unknown_cells
            );
        }
    }

    for failed in &report.failed {
        println!("Failed: {} - {}", failed.input.display(), failed.error);
    }

    println!(
        "\nConverted {} of {} tables into {}",
        report.converted.len(),
        report.total(),
        output_dir.display()
    );
}
