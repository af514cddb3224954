use crate::core::batch_pricing::BatchColumns;
use crate::core::exclusion::DEFAULT_PREVIEW_LIMIT;
use crate::core::ConfigProvider;
use crate::domain::model::{MarginMode, PricingParameters};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_COMMISSION_PERCENT: f64 = 14.0;
pub const DEFAULT_VAT_PERCENT: f64 = 22.0;
pub const DEFAULT_ABSOLUTE_MARGIN: f64 = 2.0;
pub const DEFAULT_PERCENTAGE_MARGIN: f64 = 15.0;
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Settings file. Every section is optional; command line flags are applied
/// on top of whatever the file provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pricing: PricingConfig,
    pub filter: FilterConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Percentages are written as on a price list: `14.0` means 14%.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub commission_percent: Option<f64>,
    pub vat_percent: Option<f64>,
    pub margin_mode: Option<MarginMode>,
    /// Currency per unit in absolute mode, percent of the pre-tax price in
    /// percentage mode.
    pub margin_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub preview_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub format_column: Option<String>,
    pub net_cost_column: Option<String>,
    pub shipping_column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: Option<String>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left untouched.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn commission_percent(&self) -> f64 {
        self.pricing
            .commission_percent
            .unwrap_or(DEFAULT_COMMISSION_PERCENT)
    }

    pub fn vat_percent(&self) -> f64 {
        self.pricing.vat_percent.unwrap_or(DEFAULT_VAT_PERCENT)
    }

    pub fn margin_mode(&self) -> MarginMode {
        self.pricing.margin_mode.unwrap_or(MarginMode::Absolute)
    }

    /// Each mode falls back to its own default when no value is given.
    pub fn margin_value(&self) -> f64 {
        match (self.margin_mode(), self.pricing.margin_value) {
            (_, Some(value)) => value,
            (MarginMode::Absolute, None) => DEFAULT_ABSOLUTE_MARGIN,
            (MarginMode::Percentage, None) => DEFAULT_PERCENTAGE_MARGIN,
        }
    }

    /// Rates converted from percent to fractions, ready for the solver.
    pub fn pricing_parameters(&self) -> PricingParameters {
        let margin_mode = self.margin_mode();
        let margin_value = match margin_mode {
            MarginMode::Absolute => self.margin_value(),
            MarginMode::Percentage => self.margin_value() / 100.0,
        };

        PricingParameters::new(
            self.commission_percent() / 100.0,
            self.vat_percent() / 100.0,
            margin_mode,
            margin_value,
        )
    }

    pub fn batch_columns(&self) -> BatchColumns {
        let defaults = BatchColumns::default();
        BatchColumns {
            format: self.batch.format_column.clone().unwrap_or(defaults.format),
            net_cost: self.batch.net_cost_column.clone().unwrap_or(defaults.net_cost),
            shipping: self.batch.shipping_column.clone().unwrap_or(defaults.shipping),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_range("pricing.commission_percent", self.commission_percent(), 0.0, 100.0)?;
        validation::validate_range("pricing.vat_percent", self.vat_percent(), 0.0, 100.0)?;

        let margin = self.margin_value();
        match self.margin_mode() {
            MarginMode::Absolute => {
                validation::validate_range("pricing.margin_value", margin, 0.0, f64::MAX)?
            }
            MarginMode::Percentage => {
                validation::validate_range("pricing.margin_value", margin, 0.0, 100.0)?
            }
        }

        if let Some(limit) = self.filter.preview_limit {
            validation::validate_positive_number("filter.preview_limit", limit, 1)?;
        }

        let columns = self.batch_columns();
        validation::validate_non_empty_string("batch.format_column", &columns.format)?;
        validation::validate_non_empty_string("batch.net_cost_column", &columns.net_cost)?;
        validation::validate_non_empty_string("batch.shipping_column", &columns.shipping)?;

        validation::validate_path("output.directory", self.output_dir())?;

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn output_dir(&self) -> &str {
        self.output.directory.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    fn preview_limit(&self) -> usize {
        self.filter.preview_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
