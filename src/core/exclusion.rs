use crate::domain::model::{CellValue, Table};
use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

pub const MAIN_TABLE: &str = "main file";
pub const REMOVAL_TABLE: &str = "removal file";

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub kept: Table,
    pub removed_count: usize,
    pub removed_preview: Table,
}

/// Canonical form of a key: no whitespace anywhere, one trailing `.0`
/// dropped, lowercase.
///
/// ```
/// use cleanlet::core::exclusion::normalize_key;
/// assert_eq!(normalize_key("  123.0 "), "123");
/// assert_eq!(normalize_key("ABC 123"), "abc123");
/// ```
pub fn normalize_key(raw: &str) -> String {
    let compact: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.strip_suffix(".0").unwrap_or(&compact);
    compact.to_lowercase()
}

/// Significant digits an `f64` carries without rounding two codes together.
const MAX_NUMERIC_DIGITS: usize = 15;

/// Optional sign, digits, optional fraction. Exponents and `inf`/`nan` stay text.
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

/// Text that reads as a number is keyed like a numeric cell, so `0123` and
/// `123.50` from a csv match `123` and `123.5` from a workbook.
fn numeric_key(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact.chars().filter(char::is_ascii_digit).count();
    if !is_plain_decimal(&compact) || digits > MAX_NUMERIC_DIGITS {
        return None;
    }
    compact
        .parse::<f64>()
        .ok()
        .and_then(|n| CellValue::Number(n).as_text())
}

fn normalize_cell(cell: &CellValue) -> Option<String> {
    let text = match cell {
        CellValue::Text(text) => numeric_key(text).unwrap_or_else(|| text.clone()),
        other => other.as_text()?,
    };
    Some(normalize_key(&text))
}

/// Builds the exclusion set from one column. Missing cells are skipped.
pub fn exclusion_set(table: &Table, column: &str) -> Result<HashSet<String>> {
    let index = table
        .column_index(column)
        .ok_or_else(|| EtlError::ColumnNotFound {
            table: REMOVAL_TABLE.to_string(),
            column: column.to_string(),
        })?;

    Ok(table
        .rows
        .iter()
        .filter_map(|record| normalize_cell(record.get(index)))
        .collect())
}

pub fn filter(
    primary: &Table,
    exclusion: &Table,
    primary_key: &str,
    exclusion_key: &str,
) -> Result<FilterOutcome> {
    filter_with_preview_limit(
        primary,
        exclusion,
        primary_key,
        exclusion_key,
        DEFAULT_PREVIEW_LIMIT,
    )
}

pub fn filter_with_preview_limit(
    primary: &Table,
    exclusion: &Table,
    primary_key: &str,
    exclusion_key: &str,
    preview_limit: usize,
) -> Result<FilterOutcome> {
    let key_index = primary
        .column_index(primary_key)
        .ok_or_else(|| EtlError::ColumnNotFound {
            table: MAIN_TABLE.to_string(),
            column: primary_key.to_string(),
        })?;
    let to_remove = exclusion_set(exclusion, exclusion_key)?;

    tracing::debug!(
        "Exclusion set holds {} distinct keys from '{}'",
        to_remove.len(),
        exclusion_key
    );

    let mut kept = Table::new(primary.columns.clone());
    let mut removed_preview = Table::new(primary.columns.clone());
    let mut removed_count = 0;

    for record in &primary.rows {
        let matched = normalize_cell(record.get(key_index))
            .map(|key| to_remove.contains(&key))
            .unwrap_or(false);

        if matched {
            removed_count += 1;
            if removed_preview.len() < preview_limit {
                removed_preview.rows.push(record.clone());
            }
        } else {
            kept.rows.push(record.clone());
        }
    }

    Ok(FilterOutcome {
        kept,
        removed_count,
        removed_preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn single_column(name: &str, values: Vec<CellValue>) -> Table {
        Table::with_rows(
            vec![name.to_string()],
            values.into_iter().map(|v| Record::new(vec![v])).collect(),
        )
    }

    fn texts(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  123.0 "), "123");
        assert_eq!(normalize_key("123"), "123");
        assert_eq!(normalize_key("ABC 123"), "abc123");
        assert_eq!(normalize_key("\tA b\u{a0}C "), "abc");
        assert_eq!(normalize_key("12.05"), "12.05");
        assert_eq!(normalize_key("1.0.0"), "1.0");
    }

    #[test]
    fn test_scenario_mixed_formatting() {
        let primary = single_column("id", texts(&["123", "124.0", " 125 "]));
        let exclusion = single_column("code", texts(&["123", "125"]));

        let outcome = filter(&primary, &exclusion, "id", "code").unwrap();

        assert_eq!(outcome.removed_count, 2);
        assert_eq!(outcome.kept.rows, vec![Record::new(texts(&["124.0"]))]);
        assert_eq!(outcome.removed_preview.len(), 2);
        assert_eq!(outcome.removed_preview.rows[1].cells, texts(&[" 125 "]));
    }

    #[test]
    fn test_numeric_cells_match_text_codes() {
        let primary = single_column(
            "ean",
            vec![CellValue::Number(8001234567890.0), CellValue::text("X1")],
        );
        let exclusion = single_column("ean", texts(&["8001234567890.0", " x 1 "]));

        let outcome = filter(&primary, &exclusion, "ean", "ean").unwrap();
        assert_eq!(outcome.removed_count, 2);
        assert!(outcome.kept.is_empty());
    }

    #[test]
    fn test_numeric_text_matches_by_value() {
        let primary = single_column(
            "code",
            texts(&["0123", "123.50", "+7", "1e3", "0123A", "12345678901234567"]),
        );
        let exclusion = single_column(
            "code",
            vec![
                CellValue::Number(123.0),
                CellValue::Number(123.5),
                CellValue::text("7.00"),
                CellValue::Number(1000.0),
                CellValue::text("123a"),
                CellValue::text("12345678901234568"),
            ],
        );

        let outcome = filter(&primary, &exclusion, "code", "code").unwrap();
        assert_eq!(outcome.removed_count, 3);
        assert_eq!(
            outcome.kept.rows,
            texts(&["1e3", "0123A", "12345678901234567"])
                .into_iter()
                .map(|v| Record::new(vec![v]))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_missing_values_never_match() {
        let primary = single_column("id", vec![CellValue::Missing, CellValue::text("a")]);
        let exclusion = single_column("code", vec![CellValue::Missing, CellValue::text("  ")]);

        let outcome = filter(&primary, &exclusion, "id", "code").unwrap();
        assert_eq!(outcome.removed_count, 0);
        assert_eq!(outcome.kept.len(), 2);
    }

    #[test]
    fn test_empty_tables() {
        let primary = single_column("id", texts(&["1", "2"]));
        let empty_exclusion = Table::new(vec!["code".to_string()]);
        let outcome = filter(&primary, &empty_exclusion, "id", "code").unwrap();
        assert_eq!(outcome.removed_count, 0);
        assert_eq!(outcome.kept, primary);

        let empty_primary = Table::new(vec!["id".to_string()]);
        let exclusion = single_column("code", texts(&["1"]));
        let outcome = filter(&empty_primary, &exclusion, "id", "code").unwrap();
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.removed_count, 0);
    }

    #[test]
    fn test_missing_key_columns() {
        let primary = single_column("id", texts(&["1"]));
        let exclusion = single_column("code", texts(&["1"]));

        match filter(&primary, &exclusion, "sku", "code") {
            Err(EtlError::ColumnNotFound { table, column }) => {
                assert_eq!(table, MAIN_TABLE);
                assert_eq!(column, "sku");
            }
            other => panic!("expected ColumnNotFound, got {:?}", other),
        }

        match filter(&primary, &exclusion, "id", "ean") {
            Err(EtlError::ColumnNotFound { table, column }) => {
                assert_eq!(table, REMOVAL_TABLE);
                assert_eq!(column, "ean");
            }
            other => panic!("expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_counts_order_and_idempotence() {
        let values: Vec<String> = (0..30).map(|i| format!("{} ", i)).collect();
        let primary = single_column(
            "id",
            values.iter().map(|v| CellValue::text(v.as_str())).collect(),
        );
        let exclusion = single_column(
            "code",
            (0..30)
                .filter(|i| i % 2 == 0)
                .map(|i| CellValue::Number(i as f64))
                .collect(),
        );

        let outcome = filter(&primary, &exclusion, "id", "code").unwrap();
        assert_eq!(outcome.kept.len() + outcome.removed_count, primary.len());
        assert_eq!(outcome.removed_count, 15);
        assert_eq!(outcome.removed_preview.len(), DEFAULT_PREVIEW_LIMIT);
        assert_eq!(outcome.removed_preview.rows[0].cells, texts(&["0 "]));
        assert_eq!(outcome.removed_preview.rows[9].cells, texts(&["18 "]));
        assert_eq!(outcome.kept.rows[0].cells, texts(&["1 "]));
        assert_eq!(outcome.kept.rows[14].cells, texts(&["29 "]));

        let again = filter(&outcome.kept, &exclusion, "id", "code").unwrap();
        assert_eq!(again.removed_count, 0);
        assert_eq!(again.kept, outcome.kept);
    }

    #[test]
    fn test_custom_preview_limit() {
        let primary = single_column("id", texts(&["a", "b", "c"]));
        let exclusion = single_column("code", texts(&["A", "B", "C"]));
        let outcome = filter_with_preview_limit(&primary, &exclusion, "id", "code", 1).unwrap();
        assert_eq!(outcome.removed_count, 3);
        assert_eq!(outcome.removed_preview.rows, vec![Record::new(texts(&["a"]))]);
    }
}
