use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Healthy,
    Corroded,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleClass {
    Healthy,
    Corroded,
    Missing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixelCounts {
    pub corroded: u64,
    pub healthy: u64,
    pub background: u64,
}

impl PixelCounts {
    pub fn record(&mut self, class: PixelClass) {
        match class {
            PixelClass::Corroded => self.corroded += 1,
            PixelClass::Healthy => self.healthy += 1,
            PixelClass::Background => self.background += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    pub corroded: u64,
    pub healthy: u64,
    pub missing: u64,
}

impl SampleCounts {
    pub fn record(&mut self, class: SampleClass) {
        match class {
            SampleClass::Corroded => self.corroded += 1,
            SampleClass::Healthy => self.healthy += 1,
            SampleClass::Missing => self.missing += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassCounts {
    Pixels(PixelCounts),
    Samples(SampleCounts),
}

impl ClassCounts {
    pub fn corroded(&self) -> u64 {
        match self {
            ClassCounts::Pixels(c) => c.corroded,
            ClassCounts::Samples(c) => c.corroded,
        }
    }

    pub fn healthy(&self) -> u64 {
        match self {
            ClassCounts::Pixels(c) => c.healthy,
            ClassCounts::Samples(c) => c.healthy,
        }
    }
}

/// Outcome of running one classifier over one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub percentage: f64,
    pub counts: ClassCounts,
    /// Set when nothing fell into either the corroded or the healthy class.
    pub low_confidence: bool,
    pub processing_time_us: u64,
}

impl Classification {
    pub fn from_counts(counts: ClassCounts) -> Self {
        let corroded = counts.corroded();
        let classified = corroded + counts.healthy();
        let (percentage, low_confidence) = if classified == 0 {
            (0.0, true)
        } else {
            ((corroded as f64 / classified as f64 * 100.0).clamp(0.0, 100.0), false)
        };

        Self {
            percentage,
            counts,
            low_confidence,
            processing_time_us: 0,
        }
    }

    pub fn with_timing(mut self, start_time: Instant) -> Self {
        self.processing_time_us = start_time.elapsed().as_micros() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_uses_only_classified_counts() {
        let counts = ClassCounts::Pixels(PixelCounts {
            corroded: 1,
            healthy: 3,
            background: 96,
        });
        let classification = Classification::from_counts(counts);
        assert_eq!(classification.percentage, 25.0);
        assert!(!classification.low_confidence);
    }

    #[test]
    fn empty_denominator_is_zero_and_low_confidence() {
        let counts = ClassCounts::Samples(SampleCounts {
            corroded: 0,
            healthy: 0,
            missing: 12,
        });
        let classification = Classification::from_counts(counts);
        assert_eq!(classification.percentage, 0.0);
        assert!(classification.low_confidence);
    }
}
