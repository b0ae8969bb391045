//! Little-endian field readers for DNT streams
//!
//! Thin wrappers over `byteorder` that turn an early end of stream into
//! [`FormatError::Truncated`] naming the field that was being read.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::FormatError;

/// Map an I/O error, treating EOF as truncation of `field`
#[inline]
fn map_err(err: io::Error, field: &'static str) -> FormatError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FormatError::Truncated { field }
    } else {
        FormatError::Io(err)
    }
}

pub fn read_u8<R: Read>(reader: &mut R, field: &'static str) -> Result<u8, FormatError> {
    reader.read_u8().map_err(|e| map_err(e, field))
}

pub fn read_i16<R: Read>(reader: &mut R, field: &'static str) -> Result<i16, FormatError> {
    reader
        .read_i16::<LittleEndian>()
        .map_err(|e| map_err(e, field))
}

pub fn read_i32<R: Read>(reader: &mut R, field: &'static str) -> Result<i32, FormatError> {
    reader
        .read_i32::<LittleEndian>()
        .map_err(|e| map_err(e, field))
}

pub fn read_f32<R: Read>(reader: &mut R, field: &'static str) -> Result<f32, FormatError> {
    reader
        .read_f32::<LittleEndian>()
        .map_err(|e| map_err(e, field))
}

/// Read exactly `len` bytes
pub fn read_bytes<R: Read>(
    reader: &mut R,
    len: usize,
    field: &'static str,
) -> Result<Vec<u8>, FormatError> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| map_err(e, field))?;
    Ok(buf)
}

/// Consume exactly `len` bytes without buffering them
pub fn skip_bytes<R: Read>(
    reader: &mut R,
    len: usize,
    field: &'static str,
) -> Result<(), FormatError> {
    let wanted = len as u64;
    let skipped = io::copy(&mut reader.take(wanted), &mut io::sink())?;
    if skipped < wanted {
        return Err(FormatError::Truncated { field });
    }
    Ok(())
}
