pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::app::pipelines::exclusion_pipeline::{ExclusionPipeline, FilterJob};
pub use crate::app::pipelines::pricing_pipeline::{BatchJob, PricingPipeline};
pub use crate::config::cli::LocalStorage;
pub use crate::config::toml_config::TomlConfig;
#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::core::etl::EtlEngine;
pub use crate::domain::model::{CellValue, MarginMode, PricingParameters, PricingResult, Record, Table};
pub use crate::utils::error::{EtlError, Result};
