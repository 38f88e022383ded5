pub mod classifier_step;
pub mod orchestrator;
pub mod service;
mod session;
pub mod step;

pub use classifier_step::ClassifierStep;
pub use orchestrator::{AnalysisOrchestrator, AnalysisOrchestratorBuilder};
pub use service::classifier_service::{ClassificationJob, ClassifierService, ClassifierServiceBuilder};
pub use step::surface_analyzer::SurfaceAnalyzer;
