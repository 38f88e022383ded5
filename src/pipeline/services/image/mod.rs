pub mod color_segmentation;
pub mod config;

pub use color_segmentation::{rgb_to_hsv, ColorSegmentationClassifier, Hsv};
pub use self::config::{ColorSegmentationConfig, HueBand};
