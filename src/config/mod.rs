pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use command_line::*;

#[cfg(feature = "cli")]
mod command_line {
    use super::toml_config::TomlConfig;
    use crate::domain::model::MarginMode;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate, TABLE_EXTENSIONS};
    use clap::{Args, Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "cleanlet")]
    #[command(about = "Remove rows by key from spreadsheets and solve marketplace sale prices")]
    pub struct CliConfig {
        /// Path to a TOML settings file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        /// Directory for generated files when --output is not given
        #[arg(long, global = true)]
        pub output_dir: Option<String>,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub log_json: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Drop rows of the main file whose key appears in the removal file
        Filter(FilterArgs),
        /// Price a single product
        Quote(QuoteArgs),
        /// Price every row of a product sheet
        Batch(BatchArgs),
    }

    #[derive(Debug, Clone, Args)]
    pub struct FilterArgs {
        /// File with the rows to keep or drop (.xlsx or .csv)
        #[arg(long)]
        pub main: String,

        /// File with the values to remove (.xlsx or .csv)
        #[arg(long)]
        pub remove: String,

        /// Key column in the main file
        #[arg(long)]
        pub main_column: String,

        /// Key column in the removal file
        #[arg(long)]
        pub remove_column: String,

        /// Output file (.xlsx or .csv)
        #[arg(short, long)]
        pub output: Option<String>,

        /// How many removed rows to show
        #[arg(long)]
        pub preview_limit: Option<usize>,
    }

    /// Pricing flags shared by `quote` and `batch`. Percentages are 0-100.
    #[derive(Debug, Clone, Default, Args)]
    pub struct PricingArgs {
        /// Marketplace commission (%)
        #[arg(long)]
        pub commission: Option<f64>,

        /// VAT (%)
        #[arg(long)]
        pub vat: Option<f64>,

        #[arg(long, value_enum)]
        pub margin_mode: Option<MarginMode>,

        /// Net margin: currency per unit, or % of the pre-tax price
        #[arg(long)]
        pub margin: Option<f64>,
    }

    #[derive(Debug, Clone, Args)]
    pub struct QuoteArgs {
        /// Product cost
        #[arg(long)]
        pub cost: f64,

        /// Shipping cost
        #[arg(long, default_value_t = 0.0)]
        pub shipping: f64,

        #[command(flatten)]
        pub pricing: PricingArgs,

        /// Print the breakdown as JSON
        #[arg(long)]
        pub json: bool,
    }

    #[derive(Debug, Clone, Args)]
    pub struct BatchArgs {
        /// Product sheet (.xlsx or .csv)
        #[arg(long)]
        pub input: String,

        /// Output file (.xlsx or .csv)
        #[arg(short, long)]
        pub output: Option<String>,

        #[command(flatten)]
        pub pricing: PricingArgs,

        #[arg(long)]
        pub format_column: Option<String>,

        #[arg(long)]
        pub net_cost_column: Option<String>,

        #[arg(long)]
        pub shipping_column: Option<String>,
    }

    impl PricingArgs {
        fn apply_to(&self, config: &mut TomlConfig) {
            if let Some(commission) = self.commission {
                config.pricing.commission_percent = Some(commission);
            }
            if let Some(vat) = self.vat {
                config.pricing.vat_percent = Some(vat);
            }
            if let Some(mode) = self.margin_mode {
                config.pricing.margin_mode = Some(mode);
            }
            if let Some(margin) = self.margin {
                config.pricing.margin_value = Some(margin);
            }
        }
    }

    impl CliConfig {
        /// Loads the settings file (if any) and layers the flags over it.
        pub fn resolve_settings(&self) -> Result<TomlConfig> {
            let mut settings = match &self.config {
                Some(path) => TomlConfig::from_file(path)?,
                None => TomlConfig::default(),
            };
            self.apply_overrides(&mut settings);
            Ok(settings)
        }

        pub fn apply_overrides(&self, settings: &mut TomlConfig) {
            if let Some(dir) = &self.output_dir {
                settings.output.directory = Some(dir.clone());
            }

            match &self.command {
                Command::Filter(args) => {
                    if let Some(limit) = args.preview_limit {
                        settings.filter.preview_limit = Some(limit);
                    }
                }
                Command::Quote(args) => args.pricing.apply_to(settings),
                Command::Batch(args) => {
                    args.pricing.apply_to(settings);
                    if let Some(column) = &args.format_column {
                        settings.batch.format_column = Some(column.clone());
                    }
                    if let Some(column) = &args.net_cost_column {
                        settings.batch.net_cost_column = Some(column.clone());
                    }
                    if let Some(column) = &args.shipping_column {
                        settings.batch.shipping_column = Some(column.clone());
                    }
                }
            }
        }
    }

    fn validate_table_path(field: &str, path: &str) -> Result<()> {
        validation::validate_path(field, path)?;
        validation::validate_file_extensions(field, &[path], TABLE_EXTENSIONS)
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            match &self.command {
                Command::Filter(args) => {
                    validate_table_path("--main", &args.main)?;
                    validate_table_path("--remove", &args.remove)?;
                    validation::validate_non_empty_string("--main-column", &args.main_column)?;
                    validation::validate_non_empty_string("--remove-column", &args.remove_column)?;
                    if let Some(output) = &args.output {
                        validate_table_path("--output", output)?;
                    }
                }
                Command::Quote(args) => {
                    validation::validate_range("--cost", args.cost, 0.0, f64::MAX)?;
                    validation::validate_range("--shipping", args.shipping, 0.0, f64::MAX)?;
                }
                Command::Batch(args) => {
                    validate_table_path("--input", &args.input)?;
                    if let Some(output) = &args.output {
                        validate_table_path("--output", output)?;
                    }
                }
            }
            Ok(())
        }
    }

}
