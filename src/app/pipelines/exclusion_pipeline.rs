use super::{encode_table, resolve_output_path};
use crate::adapters::tabular::parse_table;
use crate::core::exclusion::{filter_with_preview_limit, FilterOutcome};
use crate::core::{ConfigProvider, Pipeline, RunReport, Storage, Table};
use crate::utils::error::Result;

pub const FILTER_SHEET: &str = "Filtrato";
pub const DEFAULT_FILTER_OUTPUT: &str = "file_filtrato.xlsx";

#[derive(Debug, Clone)]
pub struct FilterJob {
    pub main_path: String,
    pub removal_path: String,
    pub main_column: String,
    pub removal_column: String,
    pub output_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExclusionInput {
    pub main: Table,
    pub removal: Table,
}

pub struct ExclusionPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    job: FilterJob,
}

impl<S: Storage, C: ConfigProvider> ExclusionPipeline<S, C> {
    pub fn new(storage: S, config: C, job: FilterJob) -> Self {
        Self {
            storage,
            config,
            job,
        }
    }

    async fn read_table(&self, path: &str) -> Result<Table> {
        let bytes = self.storage.read_file(path).await?;
        parse_table(path, &bytes)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExclusionPipeline<S, C> {
    type Extracted = ExclusionInput;
    type Transformed = FilterOutcome;

    fn name(&self) -> &str {
        "value exclusion filter"
    }

    async fn extract(&self) -> Result<ExclusionInput> {
        let main = self.read_table(&self.job.main_path).await?;
        let removal = self.read_table(&self.job.removal_path).await?;

        tracing::info!(
            "📂 Loaded {} rows from {} and {} rows from {}",
            main.len(),
            self.job.main_path,
            removal.len(),
            self.job.removal_path
        );
        Ok(ExclusionInput { main, removal })
    }

    async fn transform(&self, data: ExclusionInput) -> Result<FilterOutcome> {
        let outcome = filter_with_preview_limit(
            &data.main,
            &data.removal,
            &self.job.main_column,
            &self.job.removal_column,
            self.config.preview_limit(),
        )?;

        tracing::info!(
            "🧹 Removed {} of {} rows",
            outcome.removed_count,
            data.main.len()
        );
        Ok(outcome)
    }

    async fn load(&self, result: FilterOutcome) -> Result<RunReport> {
        let output_path = resolve_output_path(
            self.config.output_dir(),
            self.job.output_path.as_deref(),
            DEFAULT_FILTER_OUTPUT,
        );

        let data = encode_table(&result.kept, &output_path, FILTER_SHEET, &[])?;
        self.storage.write_file(&output_path, &data).await?;

        let summary = if result.removed_count > 0 {
            vec![format!(
                "Removed {} rows from the main file",
                result.removed_count
            )]
        } else {
            vec![
                "No values found to remove. Check that the codes use the same format in both files"
                    .to_string(),
            ]
        };

        Ok(RunReport {
            output_path,
            rows_written: result.kept.len(),
            summary,
            preview: (!result.removed_preview.is_empty()).then_some(result.removed_preview),
        })
    }
}
