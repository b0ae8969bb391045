//! Row decoding with per-column type dispatch
//!
//! Every row is a 4-byte id followed by one cell per column, laid out
//! according to the column's type tag. Cell-level anomalies degrade to a
//! fallback cell instead of failing the row.

use std::io::{self, Read, Seek, SeekFrom, Write};

use memchr::memchr;
use tracing::{trace, warn};

use crate::catalog::StringCatalog;
use crate::schema::{ColumnDescriptor, ColumnType, Schema};
use crate::stream::{read_bytes, read_f32, read_i16, read_i32, skip_bytes};
use crate::{FormatError, MAX_NAME_LENGTH, UNKNOWN_TYPE_MARKER};

/// Column names resolved through the catalog unless configured otherwise
pub const DEFAULT_RESOLVE_COLUMNS: &[&str] = &["_NameID", "_DescriptionID"];

/// Suffix naming the bracketed parameter column for a resolved column
pub const DEFAULT_PARAM_SUFFIX: &str = "Param";

/// How to handle a column whose type tag is not recognised
///
/// The format does not define a width for unknown tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownTagPolicy {
    /// Emit the marker and consume nothing. Later columns of the row will be
    /// read from the wrong offset if the cell had a payload.
    #[default]
    Placeholder,
    /// Emit the marker and consume a fixed number of bytes
    Skip(usize),
    /// Fail the conversion
    Reject,
}

/// Which columns are resolved through the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvePolicy {
    columns: Vec<String>,
    param_suffix: String,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_COLUMNS.iter().copied())
    }
}

impl ResolvePolicy {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            param_suffix: DEFAULT_PARAM_SUFFIX.to_string(),
        }
    }

    /// Resolve nothing; every id passes through as an integer
    pub fn none() -> Self {
        Self::new(std::iter::empty::<String>())
    }

    pub fn with_param_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.param_suffix = suffix.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn resolves(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Name of the bracketed parameter column paired with `column`
    pub fn param_column(&self, column: &str) -> String {
        format!("{}{}", column, self.param_suffix)
    }
}

/// Options shared by every row of a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub resolve: ResolvePolicy,
    pub unknown_tag: UnknownTagPolicy,
}

/// A decoded cell, ready to be written as CSV
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// String bytes with commas already replaced by carets
    Text(Vec<u8>),
    Int(i32),
    /// Message id left unresolved
    Ref(i32),
    /// Written with `Display`: shortest round-trip digits, no exponent
    Float(f32),
    /// Catalog text with commas replaced by carets
    Translated(String),
    /// Skip-and-continue fallback for an out-of-range string length.
    /// The stream was moved by `declared_len` bytes and the cell is empty.
    Skipped { declared_len: i16 },
    /// Column with an unrecognised type tag
    Unknown { tag: u8 },
}

impl Cell {
    /// Whether this cell came from a fallback path rather than a clean decode
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Skipped { .. } | Self::Unknown { .. })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Self::Text(bytes) => out.write_all(bytes),
            Self::Int(v) | Self::Ref(v) => write!(out, "{}", v),
            Self::Float(v) => write!(out, "{}", v),
            Self::Translated(s) => out.write_all(s.as_bytes()),
            Self::Skipped { .. } => Ok(()),
            Self::Unknown { .. } => out.write_all(UNKNOWN_TYPE_MARKER.as_bytes()),
        }
    }
}

/// One decoded row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: i32,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn skipped_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, Cell::Skipped { .. }))
            .count()
    }

    pub fn unknown_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, Cell::Unknown { .. }))
            .count()
    }
}

/// Per-column catalog lookup, worked out once per schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    None,
    Message { params: Option<usize> },
}

/// Decodes rows of one stream against its schema
pub struct RowDecoder<'a> {
    schema: &'a Schema,
    catalog: Option<&'a StringCatalog>,
    options: &'a DecodeOptions,
    lookups: Vec<Lookup>,
    rows_read: usize,
}

impl<'a> RowDecoder<'a> {
    pub fn new(
        schema: &'a Schema,
        catalog: Option<&'a StringCatalog>,
        options: &'a DecodeOptions,
    ) -> Self {
        let lookups = schema
            .iter()
            .map(|column| plan_lookup(schema, column, catalog.is_some(), &options.resolve))
            .collect();

        for column in schema.iter() {
            if let ColumnType::Unknown(tag) = column.kind {
                warn!(
                    column = %column.name,
                    tag,
                    policy = ?options.unknown_tag,
                    "Column has an unknown type tag"
                );
            }
        }

        Self {
            schema,
            catalog,
            options,
            lookups,
            rows_read: 0,
        }
    }

    /// Rows decoded so far
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Decode the next row from the stream
    pub fn decode<R: Read + Seek>(&mut self, reader: &mut R) -> Result<Row, FormatError> {
        let id = read_i32(reader, "row id")?;

        let mut cells = Vec::with_capacity(self.schema.len());
        for column in self.schema.iter() {
            let cell = self.decode_cell(reader, column)?;
            trace!(row = id, column = %column.name, tag = column.kind.tag(), cell = ?cell);
            cells.push(cell);
        }

        if let Some(catalog) = self.catalog {
            self.resolve_cells(catalog, &mut cells);
        }

        self.rows_read += 1;
        Ok(Row { id, cells })
    }

    fn decode_cell<R: Read + Seek>(
        &self,
        reader: &mut R,
        column: &ColumnDescriptor,
    ) -> Result<Cell, FormatError> {
        match column.kind {
            ColumnType::String => self.decode_string(reader, column),
            ColumnType::Int32 => Ok(Cell::Int(read_i32(reader, "int32 value")?)),
            ColumnType::IdRef => Ok(Cell::Ref(read_i32(reader, "message id")?)),
            ColumnType::Float32A | ColumnType::Float32B => {
                Ok(Cell::Float(read_f32(reader, "float value")?))
            }
            ColumnType::Unknown(tag) => match self.options.unknown_tag {
                UnknownTagPolicy::Placeholder => Ok(Cell::Unknown { tag }),
                UnknownTagPolicy::Skip(width) => {
                    skip_bytes(reader, width, "unknown value")?;
                    Ok(Cell::Unknown { tag })
                }
                UnknownTagPolicy::Reject => Err(FormatError::UnknownColumnType {
                    column: column.name.clone(),
                    tag,
                }),
            },
        }
    }

    fn decode_string<R: Read + Seek>(
        &self,
        reader: &mut R,
        column: &ColumnDescriptor,
    ) -> Result<Cell, FormatError> {
        let length = read_i16(reader, "string length")?;

        if length <= 0 || length as usize >= MAX_NAME_LENGTH {
            if length != 0 {
                warn!(
                    row = self.rows_read,
                    column = %column.name,
                    length,
                    "Out-of-range string length, skipping cell"
                );
            }
            reader
                .seek(SeekFrom::Current(i64::from(length)))
                .map_err(|_| FormatError::InvalidRowLength {
                    row: self.rows_read,
                    column: column.name.clone(),
                    length,
                })?;
            return Ok(Cell::Skipped {
                declared_len: length,
            });
        }

        let mut bytes = read_bytes(reader, length as usize, "string value")?;
        escape_commas(&mut bytes);
        Ok(Cell::Text(bytes))
    }

    fn resolve_cells(&self, catalog: &StringCatalog, cells: &mut [Cell]) {
        for (index, lookup) in self.lookups.iter().enumerate() {
            let Lookup::Message { params } = *lookup else {
                continue;
            };

            let resolved = match &cells[index] {
                Cell::Ref(id) => {
                    let params = params
                        .and_then(|p| match &cells[p] {
                            Cell::Text(raw) => Some(
                                catalog.resolve_bracketed_params(&String::from_utf8_lossy(raw)),
                            ),
                            _ => None,
                        })
                        .unwrap_or_default();
                    Some(catalog.render(*id, params.as_slice()))
                }
                Cell::Text(raw) => std::str::from_utf8(raw)
                    .ok()
                    .and_then(|s| s.trim().parse::<i32>().ok())
                    .map(|id| catalog.resolve(id).to_string()),
                _ => None,
            };

            if let Some(text) = resolved {
                cells[index] = Cell::Translated(escape_commas_str(text));
            }
        }
    }
}

fn plan_lookup(
    schema: &Schema,
    column: &ColumnDescriptor,
    has_catalog: bool,
    policy: &ResolvePolicy,
) -> Lookup {
    if !has_catalog || !policy.resolves(&column.name) {
        return Lookup::None;
    }

    let params = schema
        .position(&policy.param_column(&column.name))
        .filter(|&p| schema.get(p).map(|c| c.kind) == Some(ColumnType::String));

    Lookup::Message { params }
}

/// Replace every `,` with `^` in place
pub fn escape_commas(bytes: &mut [u8]) {
    let mut start = 0;
    while let Some(pos) = memchr(b',', &bytes[start..]) {
        bytes[start + pos] = b'^';
        start += pos + 1;
    }
}

fn escape_commas_str(text: String) -> String {
    if text.contains(',') {
        text.replace(',', "^")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn column(name: &str, kind: ColumnType) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            kind,
        }
    }

    fn push_string(data: &mut Vec<u8>, s: &str) {
        data.extend_from_slice(&(s.len() as i16).to_le_bytes());
        data.extend_from_slice(s.as_bytes());
    }

    fn render(cell: &Cell) -> String {
        let mut out = Vec::new();
        cell.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_decode_all_types() {
        let schema = Schema::new(vec![
            column("Name", ColumnType::String),
            column("Level", ColumnType::Int32),
            column("_IconID", ColumnType::IdRef),
            column("Rate", ColumnType::Float32A),
            column("Scale", ColumnType::Float32B),
        ]);
        let mut data = 7i32.to_le_bytes().to_vec();
        push_string(&mut data, "a,b,c");
        data.extend_from_slice(&(-12i32).to_le_bytes());
        data.extend_from_slice(&300i32.to_le_bytes());
        data.extend_from_slice(&0.25f32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());

        let options = DecodeOptions::default();
        let mut decoder = RowDecoder::new(&schema, None, &options);
        let row = decoder.decode(&mut Cursor::new(data)).unwrap();

        assert_eq!(row.id, 7);
        assert_eq!(row.cells[0], Cell::Text(b"a^b^c".to_vec()));
        assert_eq!(row.cells[1], Cell::Int(-12));
        assert_eq!(row.cells[2], Cell::Ref(300));
        assert_eq!(render(&row.cells[3]), "0.25");
        assert_eq!(render(&row.cells[4]), "2");
        assert_eq!(decoder.rows_read(), 1);
    }

    #[test]
    fn test_float_rendering() {
        // Shortest round-trip, never an exponent
        assert_eq!(render(&Cell::Float(std::f32::consts::PI)), "3.1415927");
        assert_eq!(render(&Cell::Float(1.0e7)), "10000000");
        assert_eq!(render(&Cell::Float(1.0e-7)), "0.0000001");
        assert_eq!(render(&Cell::Float(-0.5)), "-0.5");
        assert_eq!(render(&Cell::Float(f32::NAN)), "NaN");
        assert_eq!(render(&Cell::Float(f32::INFINITY)), "inf");
    }

    #[test]
    fn test_escape_commas() {
        let mut bytes = b",x,,y,".to_vec();
        escape_commas(&mut bytes);
        assert_eq!(bytes, b"^x^^y^");
    }

    #[test]
    fn test_name_id_resolved() {
        let schema = Schema::new(vec![column("_NameID", ColumnType::IdRef)]);
        let catalog = StringCatalog::from_entries([(42, "Sword")]);
        let options = DecodeOptions::default();

        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&42i32.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&43i32.to_le_bytes());

        let mut cursor = Cursor::new(data);
        let mut decoder = RowDecoder::new(&schema, Some(&catalog), &options);
        let found = decoder.decode(&mut cursor).unwrap();
        let missing = decoder.decode(&mut cursor).unwrap();

        assert_eq!(found.cells[0], Cell::Translated("Sword".to_string()));
        assert_eq!(missing.cells[0], Cell::Translated(String::new()));
        assert_eq!(render(&missing.cells[0]), "");
    }

    #[test]
    fn test_without_catalog_ids_pass_through() {
        let schema = Schema::new(vec![column("_NameID", ColumnType::IdRef)]);
        let options = DecodeOptions::default();
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&42i32.to_le_bytes());

        let row = RowDecoder::new(&schema, None, &options)
            .decode(&mut Cursor::new(data))
            .unwrap();
        assert_eq!(render(&row.cells[0]), "42");
    }

    #[test]
    fn test_restricted_policy() {
        let schema = Schema::new(vec![
            column("_NameID", ColumnType::IdRef),
            column("_DescriptionID", ColumnType::IdRef),
        ]);
        let catalog = StringCatalog::from_entries([(1, "Name"), (2, "Description")]);
        let options = DecodeOptions {
            resolve: ResolvePolicy::new(["_NameID"]),
            ..Default::default()
        };
        let mut data = 0i32.to_le_bytes().to_vec();
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());

        let row = RowDecoder::new(&schema, Some(&catalog), &options)
            .decode(&mut Cursor::new(data))
            .unwrap();
        assert_eq!(row.cells[0], Cell::Translated("Name".to_string()));
        assert_eq!(row.cells[1], Cell::Ref(2));
    }

    #[test]
    fn test_default_policy_is_superset() {
        let policy = ResolvePolicy::default();
        assert!(policy.resolves("_NameID"));
        assert!(policy.resolves("_DescriptionID"));
        assert!(!policy.resolves("_IconID"));
        assert!(!ResolvePolicy::none().resolves("_NameID"));
        assert_eq!(policy.param_column("_NameID"), "_NameIDParam");
        assert_eq!(
            policy.with_param_suffix("Args").param_column("_NameID"),
            "_NameIDArgs"
        );
    }

    #[test]
    fn test_template_with_bracketed_params() {
        let schema = Schema::new(vec![
            column("_DescriptionID", ColumnType::IdRef),
            column("_DescriptionIDParam", ColumnType::String),
        ]);
        let catalog = StringCatalog::from_entries([
            (10, "Deals {0} damage, then {1}"),
            (20, "150"),
            (30, "burns"),
        ]);
        let options = DecodeOptions::default();

        let mut data = 5i32.to_le_bytes().to_vec();
        data.extend_from_slice(&10i32.to_le_bytes());
        push_string(&mut data, "{20},{30}");

        let row = RowDecoder::new(&schema, Some(&catalog), &options)
            .decode(&mut Cursor::new(data))
            .unwrap();

        assert_eq!(
            row.cells[0],
            Cell::Translated("Deals 150 damage^ then burns".to_string())
        );
        assert_eq!(row.cells[1], Cell::Text(b"{20}^{30}".to_vec()));
    }

    #[test]
    fn test_textual_id_in_string_column() {
        let schema = Schema::new(vec![column("_NameID", ColumnType::String)]);
        let catalog = StringCatalog::from_entries([(42, "Sword")]);
        let options = DecodeOptions::default();

        let mut data = 0i32.to_le_bytes().to_vec();
        push_string(&mut data, "42");
        data.extend_from_slice(&1i32.to_le_bytes());
        push_string(&mut data, "n/a");

        let mut cursor = Cursor::new(data);
        let mut decoder = RowDecoder::new(&schema, Some(&catalog), &options);
        assert_eq!(
            decoder.decode(&mut cursor).unwrap().cells[0],
            Cell::Translated("Sword".to_string())
        );
        assert_eq!(
            decoder.decode(&mut cursor).unwrap().cells[0],
            Cell::Text(b"n/a".to_vec())
        );
    }

    #[test]
    fn test_invalid_string_length_skips() {
        let schema = Schema::new(vec![
            column("Name", ColumnType::String),
            column("Level", ColumnType::Int32),
        ]);
        let options = DecodeOptions::default();

        // Zero length: nothing to skip, next column intact
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&0i16.to_le_bytes());
        data.extend_from_slice(&9i32.to_le_bytes());

        let row = RowDecoder::new(&schema, None, &options)
            .decode(&mut Cursor::new(data))
            .unwrap();
        assert_eq!(row.cells[0], Cell::Skipped { declared_len: 0 });
        assert!(row.cells[0].is_fallback());
        assert_eq!(row.cells[1], Cell::Int(9));
        assert_eq!(row.skipped_cells(), 1);
    }

    #[test]
    fn test_negative_string_length_seeks_back() {
        let schema = Schema::new(vec![
            column("Name", ColumnType::String),
            column("Level", ColumnType::Int32),
        ]);
        let options = DecodeOptions::default();

        // Seeking back 2 bytes lands on the length field itself
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-2i16).to_le_bytes());
        data.extend_from_slice(&[0u8; 2]);

        let mut cursor = Cursor::new(data);
        let row = RowDecoder::new(&schema, None, &options)
            .decode(&mut cursor)
            .unwrap();
        assert_eq!(row.cells[0], Cell::Skipped { declared_len: -2 });
        assert_eq!(row.cells[1], Cell::Int(i32::from_le_bytes([0xfe, 0xff, 0, 0])));
    }

    #[test]
    fn test_seek_before_start_is_fatal() {
        let schema = Schema::new(vec![column("Name", ColumnType::String)]);
        let options = DecodeOptions::default();
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-100i16).to_le_bytes());

        let err = RowDecoder::new(&schema, None, &options)
            .decode(&mut Cursor::new(data))
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidRowLength { row: 0, length: -100, .. }
        ));
    }

    #[test]
    fn test_unknown_tag_policies() {
        let schema = Schema::new(vec![
            column("Mystery", ColumnType::Unknown(9)),
            column("Level", ColumnType::Int32),
        ]);
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&[0xaa, 0xbb]);
        data.extend_from_slice(&5i32.to_le_bytes());

        let placeholder = DecodeOptions::default();
        let row = RowDecoder::new(&schema, None, &placeholder)
            .decode(&mut Cursor::new(data.clone()))
            .unwrap();
        assert_eq!(row.cells[0], Cell::Unknown { tag: 9 });
        assert_eq!(render(&row.cells[0]), UNKNOWN_TYPE_MARKER);
        // Nothing consumed, so the int is read from the unknown payload
        assert_eq!(row.cells[1], Cell::Int(i32::from_le_bytes([0xaa, 0xbb, 5, 0])));

        let skip = DecodeOptions {
            unknown_tag: UnknownTagPolicy::Skip(2),
            ..Default::default()
        };
        let row = RowDecoder::new(&schema, None, &skip)
            .decode(&mut Cursor::new(data.clone()))
            .unwrap();
        assert_eq!(row.cells[1], Cell::Int(5));
        assert_eq!(row.unknown_cells(), 1);

        let reject = DecodeOptions {
            unknown_tag: UnknownTagPolicy::Reject,
            ..Default::default()
        };
        let err = RowDecoder::new(&schema, None, &reject)
            .decode(&mut Cursor::new(data))
            .unwrap_err();
        assert!(matches!(err, FormatError::UnknownColumnType { tag: 9, .. }));
    }

    #[test]
    fn test_oversized_unknown_skip_is_truncated() {
        let schema = Schema::new(vec![column("Mystery", ColumnType::Unknown(9))]);
        let options = DecodeOptions {
            unknown_tag: UnknownTagPolicy::Skip(usize::MAX),
            ..Default::default()
        };
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 8]);

        assert!(matches!(
            RowDecoder::new(&schema, None, &options).decode(&mut Cursor::new(data)),
            Err(FormatError::Truncated { field: "unknown value" })
        ));
    }

    #[test]
    fn test_truncated_row() {
        let schema = Schema::new(vec![column("Level", ColumnType::Int32)]);
        let options = DecodeOptions::default();
        let mut data = 1i32.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x01, 0x02]);

        assert!(matches!(
            RowDecoder::new(&schema, None, &options).decode(&mut Cursor::new(data)),
            Err(FormatError::Truncated { field: "int32 value" })
        ));
    }
}
