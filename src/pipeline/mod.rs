pub mod orchestration;
pub mod services;
pub mod types;

pub use orchestration::{AnalysisOrchestrator, ClassifierStep, SurfaceAnalyzer};
pub use services::{severity, Severity};
pub use types::{AnalysisRequest, AnalysisResult, AnalysisStatus, DataType, RawInput, RequestId};
