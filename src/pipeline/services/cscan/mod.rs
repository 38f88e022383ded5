pub mod config;
pub mod thickness_pattern;

pub use self::config::ThicknessConfig;
pub use thickness_pattern::ThicknessPatternClassifier;
