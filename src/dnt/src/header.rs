//! DNT record header parsing
//!
//! The preamble is three little-endian fields read back to back:
//! - Bytes 0-3: row count (superseded by bytes 6-9)
//! - Bytes 4-5: column count
//! - Bytes 6-9: row count
//!
//! Only the second row count is kept.

use std::io::Read;

use serde::Serialize;

use crate::stream::{read_i16, read_i32};
use crate::FormatError;

/// Header size in bytes
pub const HEADER_SIZE: usize = 10;

/// Parsed DNT header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Number of rows that follow the column directory
    pub row_count: i32,
    /// Number of entries in the column directory
    pub column_count: i16,
}

impl Header {
    /// Read the header from the start of a DNT stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let _superseded = read_i32(reader, "row count")?;
        let column_count = read_i16(reader, "column count")?;
        let row_count = read_i32(reader, "row count")?;

        if row_count < 0 || column_count < 0 {
            return Err(FormatError::InvalidHeader {
                rows: row_count,
                columns: column_count,
            });
        }

        Ok(Self {
            row_count,
            column_count,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.row_count as usize
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.column_count as usize
    }
}
