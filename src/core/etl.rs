use crate::core::{Pipeline, RunReport};
use crate::utils::error::Result;
use std::time::Instant;

/// Runs a pipeline's three phases in order and logs each one.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {}", name);

        tracing::debug!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;

        tracing::debug!("Transforming data...");
        let transformed = self.pipeline.transform(raw_data).await?;

        tracing::debug!("Loading data...");
        let report = self.pipeline.load(transformed).await?;

        tracing::info!(
            "✅ {} finished in {:?}: {} rows written to {}",
            name,
            started.elapsed(),
            report.rows_written,
            report.output_path
        );
        Ok(report)
    }
}
