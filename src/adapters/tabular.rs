use crate::domain::model::{CellValue, Record, Table};
use crate::utils::error::{EtlError, Result};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            _ => Err(EtlError::FileParse {
                path: path.to_string(),
                message: "only .xlsx and .csv files are supported".to_string(),
            }),
        }
    }
}

/// Decodes file contents into a table, picking the reader from the extension.
pub fn parse_table(path: &str, bytes: &[u8]) -> Result<Table> {
    let parse_error = |message: String| EtlError::FileParse {
        path: path.to_string(),
        message,
    };

    let table = match TableFormat::from_path(path)? {
        TableFormat::Csv => parse_csv(bytes).map_err(|e| parse_error(e.to_string()))?,
        TableFormat::Xlsx => parse_xlsx(bytes).map_err(parse_error)?,
    };

    tracing::debug!(
        "Parsed '{}': {} columns, {} rows",
        path,
        table.columns.len(),
        table.len()
    );
    Ok(table)
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn header_name(raw: &str, index: usize) -> String {
    let name = raw.trim_start_matches('\u{feff}');
    if name.trim().is_empty() {
        format!("Unnamed: {}", index)
    } else {
        name.to_string()
    }
}

/// CSV cells stay text; invalid UTF-8 is replaced rather than rejected.
pub fn parse_csv(bytes: &[u8]) -> std::result::Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .from_reader(bytes);

    let columns = reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, field)| header_name(&String::from_utf8_lossy(field), i))
        .collect();
    let mut table = Table::new(columns);

    for record in reader.byte_records() {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Missing
                } else {
                    CellValue::Text(String::from_utf8_lossy(field).into_owned())
                }
            })
            .collect();
        table.push_row(Record::new(cells));
    }

    Ok(table)
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Missing,
        Data::String(s) if s.is_empty() => CellValue::Missing,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::text(if *b { "True" } else { "False" }),
        other => CellValue::Text(other.to_string()),
    }
}

/// Reads the first worksheet; its first row is the header.
pub fn parse_xlsx(bytes: &[u8]) -> std::result::Result<Table, String> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheet".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| header_name(&cell.to_string(), i))
            .collect(),
        None => Vec::new(),
    };
    let mut table = Table::new(columns);

    for row in rows {
        table.push_row(Record::new(row.iter().map(cell_from_data).collect()));
    }

    Ok(table)
}

pub fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.rows {
        writer.write_record(record.cells.iter().map(|cell| cell.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(TableFormat::from_path("a/b.CSV").unwrap(), TableFormat::Csv);
        assert_eq!(TableFormat::from_path("b.xlsx").unwrap(), TableFormat::Xlsx);
        assert!(matches!(
            TableFormat::from_path("b.ods"),
            Err(EtlError::FileParse { .. })
        ));
    }

    #[test]
    fn test_parse_csv_keeps_text_and_marks_empty_cells() {
        let table = parse_table("codes.csv", b"ean,name\n0123,Olio\n,Filtro\n").unwrap();
        assert_eq!(table.columns, vec!["ean", "name"]);
        assert_eq!(table.value(0, "ean"), &CellValue::text("0123"));
        assert!(table.value(1, "ean").is_missing());
    }

    #[test]
    fn test_parse_csv_semicolon_and_short_rows() {
        let table = parse_csv("\u{feff}codice;prezzo;\nA;1,5\n".as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["codice", "prezzo", "Unnamed: 2"]);
        assert_eq!(table.value(0, "prezzo"), &CellValue::text("1,5"));
        assert!(table.value(0, "Unnamed: 2").is_missing());
    }

    #[test]
    fn test_parse_invalid_xlsx_is_a_parse_error() {
        match parse_table("broken.xlsx", b"not a zip archive") {
            Err(EtlError::FileParse { path, .. }) => assert_eq!(path, "broken.xlsx"),
            other => panic!("expected FileParse, got {:?}", other),
        }
    }

    #[test]
    fn test_write_csv() {
        let table = Table::with_rows(
            vec!["id".to_string(), "qty".to_string()],
            vec![Record::new(vec![CellValue::text("a,b"), CellValue::Number(2.0)])],
        );
        let bytes = write_csv(&table).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,qty\n\"a,b\",2\n");
    }
}
