//! DNT → CSV conversion
//!
//! Couples header, schema, row decoding and CSV output for one stream.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::StringCatalog;
use crate::csv::CsvWriter;
use crate::header::Header;
use crate::row::{DecodeOptions, RowDecoder};
use crate::schema::Schema;
use crate::{Error, FormatError, Result, CSV_EXTENSION};

/// Header and column directory of a table
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub header: Header,
    pub schema: Schema,
}

impl Layout {
    /// Read the header and the column directory
    pub fn read<R: Read>(input: &mut R) -> std::result::Result<Self, FormatError> {
        let header = Header::read(input)?;
        let schema = Schema::read(input, header.columns())?;
        Ok(Self { header, schema })
    }
}

/// Counters for one converted table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub rows: usize,
    pub columns: usize,
    /// String cells replaced by the skip-and-continue fallback
    pub skipped_cells: usize,
    /// Cells of columns with an unknown type tag
    pub unknown_cells: usize,
}

/// A converted file on disk
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: ConversionSummary,
}

/// Converts DNT streams to CSV with a shared catalog and options
pub struct Converter<'a> {
    catalog: Option<&'a StringCatalog>,
    options: DecodeOptions,
}

impl<'a> Converter<'a> {
    pub fn new(catalog: Option<&'a StringCatalog>, options: DecodeOptions) -> Self {
        Self { catalog, options }
    }

    /// Convert one stream, writing the CSV header line and then every row
    pub fn convert<R, W>(
        &self,
        input: &mut R,
        output: W,
    ) -> std::result::Result<ConversionSummary, FormatError>
    where
        R: Read + Seek,
        W: Write,
    {
        let Layout { header, schema } = Layout::read(input)?;
        debug!(
            rows = header.row_count,
            columns = header.column_count,
            "Read table layout"
        );

        let mut csv = CsvWriter::new(output);
        csv.write_header(schema.names())?;

        let mut decoder = RowDecoder::new(&schema, self.catalog, &self.options);
        let mut summary = ConversionSummary {
            columns: schema.len(),
            ..Default::default()
        };

        for _ in 0..header.rows() {
            let row = decoder.decode(input)?;
            summary.skipped_cells += row.skipped_cells();
            summary.unknown_cells += row.unknown_cells();
            csv.write_row(&row)?;
        }

        summary.rows = csv.rows_written();
        csv.into_inner()?;

        Ok(summary)
    }

    /// Convert `input` into `<output_dir>/<stem>.csv`
    ///
    /// Rows are written to a `.part` file that is renamed once the whole
    /// table decoded; on failure the partial file is removed.
    pub fn convert_file(&self, input: &Path, output_dir: &Path) -> Result<ConversionOutput> {
        let output = output_path(input, output_dir)?;
        let mut partial = output.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let mut reader = BufReader::new(File::open(input)?);
        let writer = BufWriter::new(File::create(&partial)?);

        match self.convert(&mut reader, writer) {
            Ok(summary) => {
                fs::rename(&partial, &output)?;
                info!(
                    input = %input.display(),
                    output = %output.display(),
                    rows = summary.rows,
                    columns = summary.columns,
                    "Converted table"
                );
                Ok(ConversionOutput {
                    input: input.to_path_buf(),
                    output,
                    summary,
                })
            }
            Err(err) => {
                let _ = fs::remove_file(&partial);
                Err(err.into())
            }
        }
    }
}

/// `<output_dir>/<stem>.csv` for an input table
pub fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::InvalidPath(input.to_path_buf()))?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(CSV_EXTENSION);
    Ok(output_dir.join(name))
}
