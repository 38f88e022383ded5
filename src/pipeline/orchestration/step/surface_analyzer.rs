use crate::config::Settings;
use crate::error::AnalysisError;
use crate::pipeline::orchestration::classifier_step::ClassifierStep;
use crate::pipeline::services::{ColorSegmentationClassifier, ThicknessPatternClassifier};
use crate::pipeline::types::{Classification, DataType, RawInput};
use async_trait::async_trait;
use std::sync::Arc;

/// Dispatches to the color or thickness classifier by data type and runs the
/// CPU-bound work on the blocking pool.
#[derive(Clone, Default)]
pub struct SurfaceAnalyzer {
    color: Arc<ColorSegmentationClassifier>,
    thickness: Arc<ThicknessPatternClassifier>,
}

impl SurfaceAnalyzer {
    pub fn new(color: ColorSegmentationClassifier, thickness: ThicknessPatternClassifier) -> Self {
        Self {
            color: Arc::new(color),
            thickness: Arc::new(thickness),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ColorSegmentationClassifier::new(settings.color.clone()),
            ThicknessPatternClassifier::new(settings.thickness.clone()),
        )
    }

    fn classify_blocking(&self, input: &RawInput) -> Result<Classification, AnalysisError> {
        match input {
            RawInput::Image(image) => Ok(self.color.classify(image)),
            RawInput::CScan(grid) => self.thickness.classify(grid),
        }
    }
}

#[async_trait]
impl ClassifierStep for SurfaceAnalyzer {
    async fn classify(
        &self,
        input: RawInput,
        data_type: DataType,
    ) -> Result<Classification, AnalysisError> {
        if input.data_type() != data_type {
            return Err(AnalysisError::ClassificationFailure(format!(
                "{} input cannot be analyzed as {}",
                input.data_type(),
                data_type
            )));
        }

        let analyzer = self.clone();
        tokio::task::spawn_blocking(move || analyzer.classify_blocking(&input))
            .await
            .map_err(|e| AnalysisError::ClassificationFailure(format!("classifier task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        "SurfaceAnalyzer"
    }
}
