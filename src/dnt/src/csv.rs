//! CSV output for decoded tables
//!
//! Fields are joined with a bare `,` and lines end with `\n`. Nothing is
//! quoted: string cells have their commas turned into carets during decode.

use std::io::{self, Write};

use crate::row::Row;
use crate::ID_COLUMN;

/// Writes a header line and rows to an underlying writer
pub struct CsvWriter<W: Write> {
    out: W,
    rows_written: usize,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows_written: 0,
        }
    }

    /// Write `_ID` followed by the column names
    pub fn write_header<'a, I>(&mut self, columns: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.out.write_all(ID_COLUMN.as_bytes())?;
        for name in columns {
            self.out.write_all(b",")?;
            self.out.write_all(name.as_bytes())?;
        }
        self.out.write_all(b"\n")
    }

    /// Write the row id followed by each cell
    pub fn write_row(&mut self, row: &Row) -> io::Result<()> {
        write!(self.out, "{}", row.id)?;
        for cell in &row.cells {
            self.out.write_all(b",")?;
            cell.write_to(&mut self.out)?;
        }
        self.out.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and hand back the writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Cell;

    #[test]
    fn test_header_line() {
        let mut csv = CsvWriter::new(Vec::new());
        csv.write_header(["Name", "_NameID"]).unwrap();
        assert_eq!(csv.into_inner().unwrap(), b"_ID,Name,_NameID\n");
    }

    #[test]
    fn test_header_without_columns() {
        let mut csv = CsvWriter::new(Vec::new());
        csv.write_header(std::iter::empty()).unwrap();
        assert_eq!(csv.into_inner().unwrap(), b"_ID\n");
    }

    #[test]
    fn test_row_line() {
        let row = Row {
            id: 1001,
            cells: vec![
                Cell::Text(b"a^b".to_vec()),
                Cell::Int(-5),
                Cell::Float(1.5),
                Cell::Skipped { declared_len: 0 },
                Cell::Translated("Sword".to_string()),
                Cell::Unknown { tag: 8 },
            ],
        };

        let mut csv = CsvWriter::new(Vec::new());
        csv.write_row(&row).unwrap();
        assert_eq!(csv.rows_written(), 1);
        assert_eq!(
            String::from_utf8(csv.into_inner().unwrap()).unwrap(),
            "1001,a^b,-5,1.5,,Sword,[Unknown Type]\n"
        );
    }

    #[test]
    fn test_carets_where_commas_were() {
        let input = "one,two,,three";
        let mut bytes = input.as_bytes().to_vec();
        crate::row::escape_commas(&mut bytes);

        let mut csv = CsvWriter::new(Vec::new());
        csv.write_row(&Row {
            id: 0,
            cells: vec![Cell::Text(bytes)],
        })
        .unwrap();
        let line = String::from_utf8(csv.into_inner().unwrap()).unwrap();
        let field = line.trim_end().split(',').nth(1).unwrap();

        assert_eq!(field.len(), input.len());
        for (written, source) in field.chars().zip(input.chars()) {
            if source == ',' {
                assert_eq!(written, '^');
            } else {
                assert_eq!(written, source);
            }
        }
    }

    #[test]
    fn test_raw_bytes_pass_through() {
        let mut csv = CsvWriter::new(Vec::new());
        csv.write_row(&Row {
            id: 2,
            cells: vec![Cell::Text(vec![0xb0, 0xa1])],
        })
        .unwrap();
        assert_eq!(csv.into_inner().unwrap(), [b'2', b',', 0xb0, 0xa1, b'\n']);
    }
}
