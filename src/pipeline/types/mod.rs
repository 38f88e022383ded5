mod analysis_result;
mod classification;
mod data_type;
mod raw_input;

pub use analysis_result::{AnalysisRequest, AnalysisResult, AnalysisStatus, RequestId};
pub use classification::{
    ClassCounts, Classification, PixelClass, PixelCounts, SampleClass, SampleCounts,
};
pub use data_type::DataType;
pub use raw_input::{CScanGrid, RawInput};
