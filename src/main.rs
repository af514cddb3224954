use anyhow::Context;
use clap::Parser;
use cleanlet::config::{BatchArgs, Command, FilterArgs, QuoteArgs};
use cleanlet::core::pricing;
use cleanlet::utils::error::ErrorSeverity;
use cleanlet::utils::{logger, validation::Validate};
use cleanlet::{
    BatchJob, CliConfig, EtlEngine, EtlError, ExclusionPipeline, FilterJob, LocalStorage,
    PricingPipeline, Table, TomlConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting cleanlet");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let settings = match config
        .resolve_settings()
        .and_then(|settings| settings.validate().map(|_| settings))
    {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };

    let outcome = match &config.command {
        Command::Filter(args) => run_filter(args, settings).await,
        Command::Batch(args) => run_batch(args, settings).await,
        Command::Quote(args) => return run_quote(args, &settings),
    };

    if let Err(e) = outcome {
        fail(&e);
    }

    Ok(())
}

async fn run_filter(args: &FilterArgs, settings: TomlConfig) -> cleanlet::Result<()> {
    let job = FilterJob {
        main_path: args.main.clone(),
        removal_path: args.remove.clone(),
        main_column: args.main_column.clone(),
        removal_column: args.remove_column.clone(),
        output_path: args.output.clone(),
    };

    let pipeline = ExclusionPipeline::new(LocalStorage::current_dir(), settings, job);
    let report = EtlEngine::new(pipeline).run().await?;

    for line in &report.summary {
        println!("✅ {}", line);
    }
    if let Some(preview) = &report.preview {
        println!();
        println!("Removed rows (first {}):", preview.len());
        print_table(preview);
    }
    println!("📁 Output saved to: {}", report.output_path);
    Ok(())
}

async fn run_batch(args: &BatchArgs, settings: TomlConfig) -> cleanlet::Result<()> {
    let job = BatchJob {
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        columns: settings.batch_columns(),
        params: settings.pricing_parameters(),
    };

    let pipeline = PricingPipeline::new(LocalStorage::current_dir(), settings, job);
    let report = EtlEngine::new(pipeline).run().await?;

    for line in &report.summary {
        println!("✅ {}", line);
    }
    if let Some(preview) = &report.preview {
        println!();
        print_table(preview);
    }
    println!("📁 Output saved to: {}", report.output_path);
    Ok(())
}

fn run_quote(args: &QuoteArgs, settings: &TomlConfig) -> anyhow::Result<()> {
    let params = settings.pricing_parameters();
    let result = match pricing::solve(args.cost, args.shipping, &params) {
        Ok(result) => result,
        Err(e) => fail(&e),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("failed to encode the quote")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Gross price (VAT included): €{:.2}", result.gross_price);
    println!("Pre-tax price:              €{:.2}", result.pre_tax_price);
    println!("VAT payable:                €{:.2}", result.vat_payable);
    println!("Marketplace commission:     €{:.2}", result.commission_amount);
    println!("Net margin:                 €{:.2}", result.net_margin);
    Ok(())
}

fn print_table(table: &Table) {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            table
                .rows
                .iter()
                .map(|row| row.get(i).to_string().chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", render(table.columns.clone()));
    for row in &table.rows {
        println!(
            "{}",
            render((0..table.columns.len()).map(|i| row.get(i).to_string()).collect())
        );
    }
}

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
