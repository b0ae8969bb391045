//! DNT column directory parsing
//!
//! Each column entry is a 2-byte signed name length, the name bytes (not
//! null-terminated), and a 1-byte type tag.

use std::io::Read;

use serde::Serialize;

use crate::stream::{read_bytes, read_i16, read_u8};
use crate::{FormatError, MAX_NAME_LENGTH};

/// Column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    /// `1` - length-prefixed byte string
    String,
    /// `2` - signed 32-bit integer
    Int32,
    /// `3` - signed 32-bit message id reference
    IdRef,
    /// `4` - 32-bit float
    Float32A,
    /// `5` - 32-bit float, decoded exactly like `Float32A`
    Float32B,
    /// Any other tag; accepted in the directory, handled at decode time
    Unknown(u8),
}

impl ColumnType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => Self::String,
            2 => Self::Int32,
            3 => Self::IdRef,
            4 => Self::Float32A,
            5 => Self::Float32B,
            other => Self::Unknown(other),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            Self::String => 1,
            Self::Int32 => 2,
            Self::IdRef => 3,
            Self::Float32A => 4,
            Self::Float32B => 5,
            Self::Unknown(tag) => *tag,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::IdRef => "idref",
            Self::Float32A | Self::Float32B => "float32",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// One entry of the column directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnType,
}

/// Ordered column directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Read `column_count` directory entries
    ///
    /// A name length outside `1..4096` is fatal: the stream offset of the
    /// next entry depends on it.
    pub fn read<R: Read>(reader: &mut R, column_count: usize) -> Result<Self, FormatError> {
        let mut columns = Vec::with_capacity(column_count);

        for index in 0..column_count {
            let length = read_i16(reader, "column name length")?;
            if length <= 0 || length as usize >= MAX_NAME_LENGTH {
                return Err(FormatError::InvalidColumnName { index, length });
            }

            let name = read_bytes(reader, length as usize, "column name")?;
            let tag = read_u8(reader, "column type")?;

            columns.push(ColumnDescriptor {
                name: String::from_utf8_lossy(&name).into_owned(),
                kind: ColumnType::from_tag(tag),
            });
        }

        Ok(Self { columns })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of the first column called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
