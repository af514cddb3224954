//! Per-row pricing of a product sheet. Every row is priced per unit (litre)
//! and per format, with the row's own shipping cost spread over the format.

use crate::core::pricing;
use crate::domain::model::{CellValue, PricingParameters, Table};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};

pub const FORMAT_COLUMN: &str = "Formato (L)";
pub const NET_COST_COLUMN: &str = "Prezzo netto";
pub const SHIPPING_COLUMN: &str = "Costo spedizione";

pub const NET_COST_OUT: &str = "Costo netto (€)";
pub const SHIPPING_PER_UNIT: &str = "Spedizione €/L";
pub const SHIPPING_PER_BATCH: &str = "Spedizione per formato (€)";
pub const TOTAL_COST_PER_UNIT: &str = "Costo totale €/L";
pub const GROSS_PER_UNIT: &str = "Prezzo vendita €/L";
pub const GROSS_PER_BATCH: &str = "Prezzo vendita per formato (€)";
pub const VAT_PAYABLE: &str = "IVA da versare (€)";
pub const COMMISSION_AMOUNT: &str = "Commissione marketplace (€)";
pub const NET_MARGIN_PER_BATCH: &str = "Margine netto per formato (€)";
pub const NET_MARGIN_PER_UNIT: &str = "Margine netto a litro (€)";

/// Working names of the computed columns before the output renames.
const SHIPPING_PER_UNIT_WORK: &str = "Spedizione per litro";
const SHIPPING_PER_BATCH_WORK: &str = "Spedizione per formato";
const TOTAL_COST_PER_UNIT_WORK: &str = "Prezzo totale a litro";
const GROSS_PER_UNIT_WORK: &str = "Prezzo vendita a litro (€)";

const FREE_SHIPPING: &str = "gratis";

/// Catalogue columns that play no part in pricing.
pub const DROPPED_COLUMNS: &[&str] = &[
    "Categoria",
    "Sottocategoria",
    "Nome olio",
    "ACEA",
    "Viscosità",
    "Tipologia",
    "Marca",
    "Descrizione",
    "Peso (Kg)",
    "Costo spedizione",
    "Mpn",
    "Marca veicoli",
    "Utilizzo",
    "Img 1",
    "Img 2",
    "Img 3",
    "Img 4",
    "Img 5",
    "Img 6",
    "Img 7",
    "competitor €/litro (spedizione inclusa)",
    "Margine reale a litro (€)",
    "Margine per formato (€)",
];

const OUTPUT_RENAMES: &[(&str, &str)] = &[
    (NET_COST_COLUMN, NET_COST_OUT),
    (SHIPPING_PER_UNIT_WORK, SHIPPING_PER_UNIT),
    (SHIPPING_PER_BATCH_WORK, SHIPPING_PER_BATCH),
    (TOTAL_COST_PER_UNIT_WORK, TOTAL_COST_PER_UNIT),
    (GROSS_PER_UNIT_WORK, GROSS_PER_UNIT),
];

/// A group of output columns painted with one background tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightBand {
    pub name: &'static str,
    pub rgb: u32,
    pub columns: &'static [&'static str],
}

pub const COST_BAND: HighlightBand = HighlightBand {
    name: "costs",
    rgb: 0xFFAAAA,
    columns: &[
        NET_COST_OUT,
        SHIPPING_PER_UNIT,
        SHIPPING_PER_BATCH,
        TOTAL_COST_PER_UNIT,
        VAT_PAYABLE,
        COMMISSION_AMOUNT,
    ],
};

pub const MARGIN_BAND: HighlightBand = HighlightBand {
    name: "net margins",
    rgb: 0xC6EFCE,
    columns: &[NET_MARGIN_PER_UNIT, NET_MARGIN_PER_BATCH],
};

pub const PRICE_BAND: HighlightBand = HighlightBand {
    name: "sale prices",
    rgb: 0xFFFF99,
    columns: &[GROSS_PER_UNIT, GROSS_PER_BATCH],
};

pub const HIGHLIGHT_BANDS: [HighlightBand; 3] = [COST_BAND, MARGIN_BAND, PRICE_BAND];

/// Input column names for the three values pricing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchColumns {
    pub format: String,
    pub net_cost: String,
    pub shipping: String,
}

impl Default for BatchColumns {
    fn default() -> Self {
        Self {
            format: FORMAT_COLUMN.to_string(),
            net_cost: NET_COST_COLUMN.to_string(),
            shipping: SHIPPING_COLUMN.to_string(),
        }
    }
}

/// Shipping for one row: `(per unit, per batch)`. Anything unreadable falls
/// back to zero so one bad row does not sink the sheet.
pub fn shipping_split(shipping: &CellValue, format: &CellValue) -> Option<(f64, f64)> {
    if let CellValue::Text(text) = shipping {
        if text.trim().eq_ignore_ascii_case(FREE_SHIPPING) {
            return Some((0.0, 0.0));
        }
    }

    let per_batch = shipping.as_f64()?;
    let format = format.as_f64().filter(|f| *f != 0.0)?;
    Some((per_batch / format, per_batch))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedRow {
    pub shipping_per_unit: f64,
    pub shipping_per_batch: f64,
    pub total_cost_per_unit: f64,
    pub gross_per_unit: f64,
    pub gross_per_batch: f64,
    pub vat_payable: f64,
    pub commission_amount: f64,
    pub net_margin_per_batch: f64,
    pub net_margin_per_unit: f64,
}

pub fn price_row(
    net_cost: f64,
    format: f64,
    shipping_per_unit: f64,
    shipping_per_batch: f64,
    params: &PricingParameters,
) -> Result<PricedRow> {
    let total_cost_per_unit = net_cost + shipping_per_unit;
    let gross_per_unit = pricing::gross_price(total_cost_per_unit, params)?;
    let gross_per_batch = gross_per_unit * format;

    let vat_payable = gross_per_batch - gross_per_batch / (1.0 + params.vat_rate);
    let commission_amount = gross_per_batch * params.commission_rate;
    let net_margin_per_batch =
        gross_per_batch - vat_payable - commission_amount - total_cost_per_unit * format;

    Ok(PricedRow {
        shipping_per_unit,
        shipping_per_batch,
        total_cost_per_unit,
        gross_per_unit,
        gross_per_batch,
        vat_payable,
        commission_amount,
        net_margin_per_batch,
        net_margin_per_unit: net_margin_per_batch / format,
    })
}

struct ComputedColumns {
    shipping_per_unit: Vec<CellValue>,
    shipping_per_batch: Vec<CellValue>,
    total_cost_per_unit: Vec<CellValue>,
    gross_per_unit: Vec<CellValue>,
    gross_per_batch: Vec<CellValue>,
    vat_payable: Vec<CellValue>,
    commission_amount: Vec<CellValue>,
    net_margin_per_batch: Vec<CellValue>,
    net_margin_per_unit: Vec<CellValue>,
}

impl ComputedColumns {
    fn with_capacity(n: usize) -> Self {
        Self {
            shipping_per_unit: Vec::with_capacity(n),
            shipping_per_batch: Vec::with_capacity(n),
            total_cost_per_unit: Vec::with_capacity(n),
            gross_per_unit: Vec::with_capacity(n),
            gross_per_batch: Vec::with_capacity(n),
            vat_payable: Vec::with_capacity(n),
            commission_amount: Vec::with_capacity(n),
            net_margin_per_batch: Vec::with_capacity(n),
            net_margin_per_unit: Vec::with_capacity(n),
        }
    }

    fn push_shipping(&mut self, per_unit: f64, per_batch: f64) {
        self.shipping_per_unit.push(CellValue::Number(per_unit));
        self.shipping_per_batch.push(CellValue::Number(per_batch));
    }

    fn push_priced(&mut self, row: Option<PricedRow>) {
        let amount = |f: fn(&PricedRow) -> f64| CellValue::from_amount(row.as_ref().map(f));
        self.total_cost_per_unit.push(amount(|r| r.total_cost_per_unit));
        self.gross_per_unit.push(amount(|r| r.gross_per_unit));
        self.gross_per_batch.push(amount(|r| r.gross_per_batch));
        self.vat_payable.push(amount(|r| r.vat_payable));
        self.commission_amount.push(amount(|r| r.commission_amount));
        self.net_margin_per_batch.push(amount(|r| r.net_margin_per_batch));
        self.net_margin_per_unit.push(amount(|r| r.net_margin_per_unit));
    }

    fn write_into(self, table: &mut Table) {
        table.set_column(SHIPPING_PER_UNIT_WORK, self.shipping_per_unit);
        table.set_column(SHIPPING_PER_BATCH_WORK, self.shipping_per_batch);
        table.set_column(TOTAL_COST_PER_UNIT_WORK, self.total_cost_per_unit);
        table.set_column(GROSS_PER_UNIT_WORK, self.gross_per_unit);
        table.set_column(GROSS_PER_BATCH, self.gross_per_batch);
        table.set_column(VAT_PAYABLE, self.vat_payable);
        table.set_column(COMMISSION_AMOUNT, self.commission_amount);
        table.set_column(NET_MARGIN_PER_BATCH, self.net_margin_per_batch);
        table.set_column(NET_MARGIN_PER_UNIT, self.net_margin_per_unit);
    }
}

/// Prices every row of `rows` and returns the output sheet: catalogue columns
/// dropped, computed columns appended, headers renamed, row order unchanged.
pub fn solve_batch(
    rows: &Table,
    columns: &BatchColumns,
    params: &PricingParameters,
) -> Result<Table> {
    let mut table = rows.clone();
    table.trim_headers();

    let missing: Vec<String> = [&columns.format, &columns.net_cost, &columns.shipping]
        .into_iter()
        .filter(|name| !table.has_column(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::MissingColumns { columns: missing });
    }

    pricing::check_feasible(params)?;

    let mut computed = ComputedColumns::with_capacity(table.len());
    let mut fallback_rows = 0usize;

    for row in 0..table.len() {
        let format_cell = table.value(row, &columns.format);
        let shipping_cell = table.value(row, &columns.shipping);

        let (per_unit, per_batch) = match shipping_split(shipping_cell, format_cell) {
            Some(split) => split,
            None => {
                fallback_rows += 1;
                tracing::warn!(
                    "Row {}: shipping '{}' with format '{}' is not usable, assuming free shipping",
                    row + 2,
                    shipping_cell,
                    format_cell
                );
                (0.0, 0.0)
            }
        };
        computed.push_shipping(per_unit, per_batch);

        let priced = match (
            table.value(row, &columns.net_cost).as_f64(),
            format_cell.as_f64(),
        ) {
            (Some(net_cost), Some(format)) => {
                Some(price_row(net_cost, format, per_unit, per_batch, params)?)
            }
            _ => {
                tracing::warn!(
                    "Row {}: net cost or format is not numeric, price left empty",
                    row + 2
                );
                None
            }
        };
        computed.push_priced(priced);
    }

    if fallback_rows > 0 {
        tracing::warn!("{} rows priced with zero shipping after a parse failure", fallback_rows);
    }

    computed.write_into(&mut table);
    table.drop_columns(DROPPED_COLUMNS);
    // The shipping input column is consumed even when it was remapped.
    table.drop_columns(&[columns.shipping.as_str()]);

    let mut renames: Vec<(&str, &str)> = OUTPUT_RENAMES.to_vec();
    renames[0].0 = columns.net_cost.as_str();
    table.rename_columns(&renames);

    Ok(table)
}
