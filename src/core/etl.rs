use crate::domain::model::RunSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct TranscriptEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> TranscriptEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Processes identifiers one after another. Identifiers that cannot be
    /// resolved are skipped and reported in the summary.
    pub async fn run(&self, record_ids: &[String]) -> Result<RunSummary> {
        tracing::info!("🚀 Starting transcript run for {} identifier(s)", record_ids.len());

        // Extract
        let extraction = self.pipeline.extract(record_ids).await?;
        tracing::info!(
            "Resolved {} student(s), skipped {} identifier(s)",
            extraction.students.len(),
            extraction.skipped.len()
        );

        // Transform
        let bundles = self.pipeline.transform(extraction.students).await?;

        // Load
        let outcomes = self.pipeline.load(bundles).await?;
        tracing::info!("Produced {} transcript(s)", outcomes.len());

        Ok(RunSummary {
            requested: record_ids.len(),
            skipped: extraction.skipped,
            outcomes,
        })
    }
}
