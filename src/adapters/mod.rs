// Adapters layer: file format codecs between raw bytes and the domain `Table`.

pub mod tabular;
pub mod workbook;
