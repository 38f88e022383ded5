pub mod config;
pub mod error;
pub mod intake;
pub mod pipeline;

pub use crate::config::Settings;
pub use error::{AnalysisError, AppError, ErrorKind, ErrorNotification};

pub use intake::{InputAdapter, Upload};
pub use pipeline::{
    severity, AnalysisOrchestrator, AnalysisResult, AnalysisStatus, DataType, RawInput, Severity,
};
