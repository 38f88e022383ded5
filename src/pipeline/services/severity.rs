use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

const MODERATE_FLOOR: f64 = 20.0;
const HIGH_FLOOR: f64 = 50.0;

/// Buckets a corrosion percentage. Each band includes its lower bound.
pub fn severity(percentage: f64) -> Severity {
    if percentage < MODERATE_FLOOR {
        Severity::Low
    } else if percentage < HIGH_FLOOR {
        Severity::Moderate
    } else {
        Severity::High
    }
}

impl From<f64> for Severity {
    fn from(percentage: f64) -> Self {
        severity(percentage)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        };
        f.write_str(label)
    }
}
