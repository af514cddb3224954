use serde::{Deserialize, Serialize};
use std::fmt;

/// One spreadsheet cell after loading. Columns carry no type, so every cell is
/// tagged on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text form used for key comparison. Integral numbers print without a
    /// fractional part, so a code stored as `123` reads as `"123"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Missing => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Wraps a computed amount; NaN and infinities become empty cells.
    pub fn from_amount(value: Option<f64>) -> Self {
        match value {
            Some(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Missing,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub cells: Vec<CellValue>,
}

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn get(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&CellValue::Missing)
    }
}

/// An ordered table: a header row plus data rows addressed by header position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` under column `name`, `Missing` when either is absent.
    pub fn value(&self, row: usize, name: &str) -> &CellValue {
        match (self.rows.get(row), self.column_index(name)) {
            (Some(record), Some(index)) => record.get(index),
            _ => &CellValue::Missing,
        }
    }

    pub fn push_row(&mut self, mut record: Record) {
        record.cells.resize(self.columns.len(), CellValue::Missing);
        self.rows.push(record);
    }

    /// Writes a whole column, replacing it in place when the name already
    /// exists and appending it otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        let index = match self.column_index(name) {
            Some(index) => index,
            None => {
                self.columns.push(name.to_string());
                for record in &mut self.rows {
                    record.cells.push(CellValue::Missing);
                }
                self.columns.len() - 1
            }
        };
        for (record, value) in self.rows.iter_mut().zip(values) {
            if record.cells.len() <= index {
                record.cells.resize(index + 1, CellValue::Missing);
            }
            record.cells[index] = value;
        }
    }

    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for record in &mut self.rows {
            let mut flags = keep.iter();
            record.cells.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    pub fn trim_headers(&mut self) {
        for column in &mut self.columns {
            let trimmed = column.trim();
            if trimmed.len() != column.len() {
                *column = trimmed.to_string();
            }
        }
    }

    pub fn head(&self, n: usize) -> Table {
        Table::with_rows(
            self.columns.clone(),
            self.rows.iter().take(n).cloned().collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum MarginMode {
    /// Target net amount per unit, in currency.
    Absolute,
    /// Target share of the pre-tax price.
    Percentage,
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginMode::Absolute => f.write_str("absolute"),
            MarginMode::Percentage => f.write_str("percentage"),
        }
    }
}

/// Rates are fractions (`0.22` for 22% VAT). Built once per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingParameters {
    pub commission_rate: f64,
    pub vat_rate: f64,
    pub margin_mode: MarginMode,
    pub margin_value: f64,
}

impl PricingParameters {
    pub fn new(commission_rate: f64, vat_rate: f64, margin_mode: MarginMode, margin_value: f64) -> Self {
        Self {
            commission_rate,
            vat_rate,
            margin_mode,
            margin_value,
        }
    }

    pub fn describe_margin(&self) -> String {
        match self.margin_mode {
            MarginMode::Absolute => format!("absolute margin {:.2}", self.margin_value),
            MarginMode::Percentage => {
                format!("percentage margin {:.2}%", self.margin_value * 100.0)
            }
        }
    }
}

/// Single-unit price breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub total_cost: f64,
    pub gross_price: f64,
    pub pre_tax_price: f64,
    pub vat_payable: f64,
    pub commission_amount: f64,
    pub net_margin: f64,
}

impl PricingResult {
    pub fn margin_ratio(&self) -> f64 {
        self.net_margin / self.pre_tax_price
    }
}

/// What a pipeline hands back to the caller once its output is written.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub output_path: String,
    pub rows_written: usize,
    pub summary: Vec<String>,
    pub preview: Option<Table>,
}
