//! DNT table decoder with CSV export
//!
//! DNT files are little-endian tables with a typed column directory. Message
//! id columns can be resolved against an XML message catalog.
//!
//! # Format Overview
//!
//! ## Header (10 bytes)
//! - Bytes 0-3: Row count (superseded)
//! - Bytes 4-5: Column count
//! - Bytes 6-9: Row count
//!
//! ## Column directory (per column)
//! - 2 bytes: Name length (1..4095)
//! - N bytes: Name
//! - 1 byte: Type tag (1 string, 2 int32, 3 message id, 4/5 float32)
//!
//! ## Rows (per row)
//! - 4 bytes: Row id
//! - One cell per column; strings are a 2-byte length followed by the bytes,
//!   all other types are 4 bytes wide

pub mod catalog;
mod convert;
pub mod csv;
mod header;
pub mod row;
mod schema;
mod stream;

use std::path::{Path, PathBuf};

// Re-export main types
pub use catalog::{
    fill_placeholders, split_bracketed_params, LoadStats, StringCatalog, PARAM_DELIMITER,
};
pub use convert::{output_path, ConversionOutput, ConversionSummary, Converter, Layout};
pub use csv::CsvWriter;
pub use header::{Header, HEADER_SIZE};
pub use row::{
    Cell, DecodeOptions, ResolvePolicy, Row, RowDecoder, UnknownTagPolicy,
    DEFAULT_PARAM_SUFFIX, DEFAULT_RESOLVE_COLUMNS,
};
pub use schema::{ColumnDescriptor, ColumnType, Schema};

/// Exclusive upper bound for column name and string cell lengths
pub const MAX_NAME_LENGTH: usize = 4096;

/// Name of the leading row id column in CSV output
pub const ID_COLUMN: &str = "_ID";

/// File extension of DNT tables
pub const DNT_EXTENSION: &str = "dnt";

/// File extension of converted tables
pub const CSV_EXTENSION: &str = "csv";

/// Catalog file looked up when a directory is given
pub const CATALOG_FILE_NAME: &str = "uistring.xml";

/// Cell text for columns with an unrecognised type tag
pub const UNKNOWN_TYPE_MARKER: &str = "[Unknown Type]";

/// Substituted for a bracketed parameter that is not a message id
pub const INVALID_PARAM_MARKER: &str = "[Invalid Param]";

/// Errors from decoding a DNT stream. Fatal to the current table only.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("Unexpected end of data while reading {field}")]
    Truncated { field: &'static str },

    #[error("Invalid header: {rows} rows, {columns} columns")]
    InvalidHeader { rows: i32, columns: i16 },

    #[error("Invalid name length {length} for column {index}")]
    InvalidColumnName { index: usize, length: i16 },

    #[error("Cannot skip {length} bytes for column '{column}' in row {row}")]
    InvalidRowLength {
        row: usize,
        column: String,
        length: i16,
    },

    #[error("Unknown type tag {tag} for column '{column}'")]
    UnknownColumnType { column: String, tag: u8 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading the message catalog. Fatal to the whole run.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Catalog is not valid UTF-8: {}", .0.display())]
    Encoding(PathBuf),

    #[error("Malformed catalog XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid message id: {0:?}")]
    InvalidMessageId(String),
}

/// Errors from file-level operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Input has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check if a path has the DNT extension (case-insensitive)
pub fn is_dnt_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(DNT_EXTENSION))
        .unwrap_or(false)
}
