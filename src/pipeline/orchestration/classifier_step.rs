use crate::error::AnalysisError;
use crate::pipeline::types::{Classification, DataType, RawInput};
use async_trait::async_trait;

/// Seam between the orchestrator and whatever turns an input into a classification.
#[async_trait]
pub trait ClassifierStep: Send + Sync {
    async fn classify(
        &self,
        input: RawInput,
        data_type: DataType,
    ) -> Result<Classification, AnalysisError>;
    fn name(&self) -> &'static str;
}
