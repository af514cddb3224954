use super::{encode_table, resolve_output_path};
use crate::adapters::tabular::parse_table;
use crate::core::batch_pricing::{solve_batch, BatchColumns, HIGHLIGHT_BANDS};
use crate::core::{ConfigProvider, Pipeline, RunReport, Storage, Table};
use crate::domain::model::PricingParameters;
use crate::utils::error::Result;

pub const PRICING_SHEET: &str = "Prezzi";
const PREVIEW_ROWS: usize = 5;

/// Default export name, stamped with the local time of the run.
pub fn default_pricing_output() -> String {
    format!(
        "prezzi_vendita_{}.xlsx",
        chrono::Local::now().format("%d.%m.%Y_%H.%M")
    )
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input_path: String,
    pub output_path: Option<String>,
    pub columns: BatchColumns,
    pub params: PricingParameters,
}

pub struct PricingPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    job: BatchJob,
}

impl<S: Storage, C: ConfigProvider> PricingPipeline<S, C> {
    pub fn new(storage: S, config: C, job: BatchJob) -> Self {
        Self {
            storage,
            config,
            job,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PricingPipeline<S, C> {
    type Extracted = Table;
    type Transformed = Table;

    fn name(&self) -> &str {
        "batch price solver"
    }

    async fn extract(&self) -> Result<Table> {
        let bytes = self.storage.read_file(&self.job.input_path).await?;
        let table = parse_table(&self.job.input_path, &bytes)?;
        tracing::info!("📂 Loaded {} rows from {}", table.len(), self.job.input_path);
        Ok(table)
    }

    async fn transform(&self, data: Table) -> Result<Table> {
        let params = &self.job.params;
        tracing::debug!(
            "Pricing with commission {:.2}%, VAT {:.2}%, {}",
            params.commission_rate * 100.0,
            params.vat_rate * 100.0,
            params.describe_margin()
        );
        solve_batch(&data, &self.job.columns, params)
    }

    async fn load(&self, result: Table) -> Result<RunReport> {
        let output_path = resolve_output_path(
            self.config.output_dir(),
            self.job.output_path.as_deref(),
            &default_pricing_output(),
        );

        let data = encode_table(&result, &output_path, PRICING_SHEET, &HIGHLIGHT_BANDS)?;
        self.storage.write_file(&output_path, &data).await?;

        let params = &self.job.params;
        Ok(RunReport {
            output_path,
            rows_written: result.len(),
            summary: vec![format!(
                "Priced {} rows with commission {:.2}%, VAT {:.2}% and {}",
                result.len(),
                params.commission_rate * 100.0,
                params.vat_rate * 100.0,
                params.describe_margin()
            )],
            preview: Some(result.head(PREVIEW_ROWS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tabular::parse_xlsx;
    use crate::app::pipelines::test_support::MockStorage;
    use crate::config::toml_config::TomlConfig;
    use crate::core::batch_pricing::{GROSS_PER_BATCH, NET_MARGIN_PER_UNIT, SHIPPING_PER_UNIT};
    use crate::core::etl::EtlEngine;
    use crate::domain::model::MarginMode;
    use crate::utils::error::EtlError;

    const SHEET: &[u8] = "Codice,Categoria,Formato (L),Prezzo netto,Costo spedizione\n\
A1,Olio,5,4,10\n\
A2,Olio,1,3,Gratis\n"
        .as_bytes();

    fn job(output: Option<&str>) -> BatchJob {
        BatchJob {
            input_path: "listino.csv".to_string(),
            output_path: output.map(str::to_string),
            columns: BatchColumns::default(),
            params: PricingParameters::new(0.14, 0.22, MarginMode::Absolute, 2.0),
        }
    }

    #[tokio::test]
    async fn test_pricing_pipeline_writes_banded_workbook() {
        let storage = MockStorage::default();
        storage.put("listino.csv", SHEET).await;
        let pipeline = PricingPipeline::new(storage.clone(), TomlConfig::default(), job(Some("prezzi.xlsx")));

        let report = EtlEngine::new(pipeline).run().await.unwrap();
        assert_eq!(report.rows_written, 2);
        assert!(report.summary[0].contains("commission 14.00%"));

        let written = storage.get_file("prezzi.xlsx").await.unwrap();
        let table = parse_xlsx(&written).unwrap();
        assert!(!table.has_column("Categoria"));
        assert_eq!(table.value(0, SHIPPING_PER_UNIT).as_f64(), Some(2.0));
        assert_eq!(table.value(1, SHIPPING_PER_UNIT).as_f64(), Some(0.0));

        let margin = table.value(0, NET_MARGIN_PER_UNIT).as_f64().unwrap();
        assert!((margin - 2.0).abs() < 1e-6);
        assert!(table.value(1, GROSS_PER_BATCH).as_f64().unwrap() > 3.0);
    }

    #[tokio::test]
    async fn test_pricing_pipeline_default_name_is_timestamped() {
        let storage = MockStorage::default();
        storage.put("listino.csv", SHEET).await;
        let pipeline = PricingPipeline::new(storage.clone(), TomlConfig::default(), job(None));

        let report = EtlEngine::new(pipeline).run().await.unwrap();
        assert!(report.output_path.contains("prezzi_vendita_"));
        assert!(storage.get_file(&report.output_path).await.is_some());
    }

    #[tokio::test]
    async fn test_pricing_pipeline_missing_columns() {
        let storage = MockStorage::default();
        storage.put("listino.csv", b"Codice,Prezzo netto\nA1,4\n").await;
        let pipeline = PricingPipeline::new(storage, TomlConfig::default(), job(Some("p.xlsx")));

        match EtlEngine::new(pipeline).run().await {
            Err(EtlError::MissingColumns { columns }) => {
                assert_eq!(columns, vec!["Formato (L)", "Costo spedizione"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other.map(|r| r.output_path)),
        }
    }
}
