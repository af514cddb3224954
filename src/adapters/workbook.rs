use crate::core::batch_pricing::HighlightBand;
use crate::domain::model::{CellValue, Table};
use crate::utils::error::{EtlError, Result};
use rust_xlsxwriter::{Color, Format, Workbook};

/// Background fill for a column, if any band claims it.
fn band_format(column: &str, bands: &[HighlightBand]) -> Option<Format> {
    bands
        .iter()
        .find(|band| band.columns.contains(&column))
        .map(|band| Format::new().set_background_color(Color::RGB(band.rgb)))
}

fn grid_position(row: usize, col: usize) -> Result<(u32, u16)> {
    let out_of_bounds = || EtlError::ProcessingError {
        message: format!("cell ({}, {}) is outside the worksheet grid", row, col),
    };
    let row = u32::try_from(row).map_err(|_| out_of_bounds())?;
    let col = u16::try_from(col).map_err(|_| out_of_bounds())?;
    Ok((row, col))
}

/// Writes `table` as a single-sheet workbook. Header cells are bold; every
/// data cell of a banded column gets that band's fill, blanks included.
pub fn write_workbook(table: &Table, sheet_name: &str, bands: &[HighlightBand]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    for (col, name) in table.columns.iter().enumerate() {
        let (row, col) = grid_position(0, col)?;
        worksheet.write_string_with_format(row, col, name, &header_format)?;
    }

    let fills: Vec<Option<Format>> = table
        .columns
        .iter()
        .map(|name| band_format(name, bands))
        .collect();

    for (r, record) in table.rows.iter().enumerate() {
        for (c, fill) in fills.iter().enumerate() {
            let (row, col) = grid_position(r + 1, c)?;
            match (record.get(c), fill) {
                (CellValue::Number(n), Some(format)) => {
                    worksheet.write_number_with_format(row, col, *n, format)?;
                }
                (CellValue::Number(n), None) => {
                    worksheet.write_number(row, col, *n)?;
                }
                (CellValue::Text(s), Some(format)) => {
                    worksheet.write_string_with_format(row, col, s, format)?;
                }
                (CellValue::Text(s), None) => {
                    worksheet.write_string(row, col, s)?;
                }
                (CellValue::Missing, Some(format)) => {
                    worksheet.write_blank(row, col, format)?;
                }
                (CellValue::Missing, None) => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
