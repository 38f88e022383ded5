pub mod cscan;
pub mod image;
pub mod severity;

pub use cscan::{ThicknessConfig, ThicknessPatternClassifier};
pub use image::{ColorSegmentationClassifier, ColorSegmentationConfig, HueBand};
pub use severity::{severity, Severity};
