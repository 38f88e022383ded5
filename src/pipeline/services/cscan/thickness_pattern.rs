use std::time::Instant;
use tracing::debug;

use super::config::ThicknessConfig;
use crate::error::AnalysisError;
use crate::pipeline::types::{CScanGrid, ClassCounts, Classification, SampleClass, SampleCounts};

/// Classifies C-scan samples by their thickness loss against the nominal wall.
#[derive(Debug, Clone, Default)]
pub struct ThicknessPatternClassifier {
    config: ThicknessConfig,
}

impl ThicknessPatternClassifier {
    pub fn new(config: ThicknessConfig) -> Self {
        Self { config }
    }

    pub fn classify_sample(&self, sample: f64, nominal: f64) -> SampleClass {
        if !sample.is_finite() {
            return SampleClass::Missing;
        }

        let loss = (nominal - sample) / nominal;
        if loss >= self.config.corrosion_threshold {
            SampleClass::Corroded
        } else {
            SampleClass::Healthy
        }
    }

    pub fn classify(&self, grid: &CScanGrid) -> Result<Classification, AnalysisError> {
        let start = Instant::now();
        let nominal = grid.nominal_thickness();
        if !(nominal.is_finite() && nominal > 0.0) {
            return Err(AnalysisError::ClassificationFailure(format!(
                "nominal thickness must be positive, got {nominal}"
            )));
        }

        let mut counts = SampleCounts::default();
        for &sample in grid.samples() {
            counts.record(self.classify_sample(sample, nominal));
        }

        let classification =
            Classification::from_counts(ClassCounts::Samples(counts)).with_timing(start);

        debug!(
            "Thickness classification of {}x{} grid (nominal {}): {} corroded, {} healthy, {} missing",
            grid.rows(),
            grid.cols(),
            nominal,
            counts.corroded,
            counts.healthy,
            counts.missing
        );

        Ok(classification)
    }
}
