use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::ReportError;

/// Field separator used by repman exports and by our own exports.
pub const PRIMARY_DELIMITER: u8 = b';';
pub const FALLBACK_DELIMITER: u8 = b',';

/// A header row plus string cells, every row padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                if row.len() > width {
                    debug!(
                        row = idx + 1,
                        cells = row.len(),
                        width,
                        "cells beyond the header discarded"
                    );
                }
                row.resize(width, String::new());
                row
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Names from `required` that are not headers of this table, in order.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads delimited text, retrying once with `,` when `;` finds a single column.
pub fn read_delimited(bytes: &[u8]) -> Result<Table, ReportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let table = read_with_delimiter(bytes, PRIMARY_DELIMITER)?;
    if table.headers.len() <= 1 && table.headers.iter().any(|h| h.contains(',')) {
        debug!("single column with ';', retrying with ','");
        return read_with_delimiter(bytes, FALLBACK_DELIMITER);
    }
    Ok(table)
}

/// Picks the reader from the file extension.
pub fn read_path(path: &Path) -> Result<Table, ReportError> {
    if !path.exists() {
        return Err(ReportError::Parse(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" | "txt" => read_delimited(&std::fs::read(path)?),
        "xlsx" | "xls" | "xlsm" | "ods" => read_spreadsheet(path),
        _ => Err(ReportError::Parse(format!(
            "unsupported file format '{ext}' (expected .csv, .txt, .xlsx, .xls, .xlsm or .ods)"
        ))),
    }
}

fn read_with_delimiter(bytes: &[u8], delimiter: u8) -> Result<Table, ReportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|value| value.trim().to_string()).collect());
    }

    Ok(Table::new(headers, rows))
}

fn read_spreadsheet(path: &Path) -> Result<Table, ReportError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::Parse("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;
    table_from_range(&range)
}

fn table_from_range(range: &Range<Data>) -> Result<Table, ReportError> {
    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| ReportError::Parse("sheet has no header row".to_string()))?;
    let headers = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let rows = rows
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn reads_semicolon_separated_text() {
        let table = read_delimited(b"fecha;turno;linea\n2024-03-05;1; TQ \n").unwrap();
        assert_eq!(table.headers, vec!["fecha", "turno", "linea"]);
        assert_eq!(table.rows, vec![vec!["2024-03-05", "1", "TQ"]]);
    }

    #[test]
    fn falls_back_to_commas() {
        let table = read_delimited(b"fecha,turno\n2024-03-05,2\n").unwrap();
        assert_eq!(table.headers, vec!["fecha", "turno"]);
        assert_eq!(table.rows[0], vec!["2024-03-05", "2"]);
    }

    #[test]
    fn strips_byte_order_mark_and_blank_rows() {
        let table = read_delimited(b"\xEF\xBB\xBFfecha;turno\n;\n2024-03-05;3\n").unwrap();
        assert_eq!(table.column("fecha"), Some(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn pads_short_rows() {
        let table = read_delimited(b"a;b;c\n1;2\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn lists_missing_columns_in_requested_order() {
        let table = Table::new(vec!["fecha".into(), "hora".into()], vec![]);
        assert_eq!(
            table.missing_columns(&["fecha", "material", "hora", "horno"]),
            vec!["material".to_string(), "horno".to_string()]
        );
    }

    #[test]
    fn reads_csv_files_from_disk() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "fecha;hora").unwrap();
        writeln!(file, "2024-03-05;06:00").unwrap();

        let table = read_path(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_unknown_extensions() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        assert!(matches!(read_path(file.path()), Err(ReportError::Parse(_))));
    }

    #[test]
    fn cuts_cells_beyond_the_header() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into(), "extra".into()]],
        );
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn sheet_cells_become_trimmed_strings() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String(" fecha ".into()));
        range.set_value((0, 1), Data::String("hora".into()));
        range.set_value((0, 2), Data::String("cantidad".into()));
        range.set_value((1, 0), Data::Float(45356.0));
        range.set_value((1, 1), Data::Float(0.25));
        range.set_value((1, 2), Data::Float(12.0));

        let table = table_from_range(&range).unwrap();
        assert_eq!(table.headers, vec!["fecha", "hora", "cantidad"]);
        // Row 2 is left empty and skipped.
        assert_eq!(table.rows, vec![vec!["45356", "0.25", "12"]]);
    }

    #[test]
    fn empty_sheet_has_no_header() {
        let range: Range<Data> = Range::empty();
        assert!(matches!(table_from_range(&range), Err(ReportError::Parse(_))));
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let mut file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"not a zip archive").unwrap();
        assert!(matches!(read_path(file.path()), Err(ReportError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = read_path(Path::new("/nonexistent/production.csv")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
