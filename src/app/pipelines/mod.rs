pub mod exclusion_pipeline;
pub mod pricing_pipeline;

use crate::adapters::tabular::{write_csv, TableFormat};
use crate::adapters::workbook::write_workbook;
use crate::core::batch_pricing::HighlightBand;
use crate::domain::model::Table;
use crate::utils::error::Result;
use std::path::Path;

/// Explicit output paths win; otherwise the default name lands in `output_dir`.
pub(crate) fn resolve_output_path(output_dir: &str, explicit: Option<&str>, default_name: &str) -> String {
    match explicit {
        Some(path) => path.to_string(),
        None => Path::new(output_dir)
            .join(default_name)
            .to_string_lossy()
            .into_owned(),
    }
}

/// Encodes a table for the file type implied by `path`. Bands only apply to
/// workbooks.
pub(crate) fn encode_table(
    table: &Table,
    path: &str,
    sheet_name: &str,
    bands: &[HighlightBand],
) -> Result<Vec<u8>> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => write_csv(table),
        TableFormat::Xlsx => write_workbook(table, sheet_name, bands),
    }
}
