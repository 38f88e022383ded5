use crate::error::AnalysisError;
use crate::pipeline::services::severity::{severity, Severity};
use crate::pipeline::types::{Classification, DataType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The request the session is currently tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub data_type: DataType,
    pub submitted_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(id: RequestId, data_type: DataType) -> Self {
        Self {
            id,
            data_type,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Idle,
    Analyzing,
    Complete,
    Error,
}

/// Session record handed to the presentation layer.
///
/// `severity` is only set for `Complete` records and the percentage stays at
/// zero for every other status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub request_id: Option<RequestId>,
    pub corrosion_percentage: f64,
    pub severity: Option<Severity>,
    pub data_type: Option<DataType>,
    pub status: AnalysisStatus,
    pub error: Option<String>,
    pub low_confidence: bool,
}

impl AnalysisResult {
    pub fn idle() -> Self {
        Self {
            request_id: None,
            corrosion_percentage: 0.0,
            severity: None,
            data_type: None,
            status: AnalysisStatus::Idle,
            error: None,
            low_confidence: false,
        }
    }

    pub fn analyzing(request: &AnalysisRequest) -> Self {
        Self {
            request_id: Some(request.id),
            data_type: Some(request.data_type),
            status: AnalysisStatus::Analyzing,
            ..Self::idle()
        }
    }

    pub fn complete(request: &AnalysisRequest, classification: &Classification) -> Self {
        let percentage = classification.percentage.clamp(0.0, 100.0);
        Self {
            request_id: Some(request.id),
            corrosion_percentage: percentage,
            severity: Some(severity(percentage)),
            data_type: Some(request.data_type),
            status: AnalysisStatus::Complete,
            error: None,
            low_confidence: classification.low_confidence,
        }
    }

    pub fn failed(request: &AnalysisRequest, error: &AnalysisError) -> Self {
        Self {
            request_id: Some(request.id),
            data_type: Some(request.data_type),
            status: AnalysisStatus::Error,
            error: Some(format!(
                "Failed to analyze {}: {}",
                request.data_type.label(),
                error
            )),
            ..Self::idle()
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.status == AnalysisStatus::Analyzing
    }

    /// One-line human readable outcome, `None` while idle or analyzing.
    pub fn summary(&self) -> Option<String> {
        let data_type = self.data_type?;
        match self.status {
            AnalysisStatus::Complete => Some(format!(
                "{} analyzed successfully. Corrosion: {:.2}%",
                capitalize(data_type.label()),
                self.corrosion_percentage
            )),
            AnalysisStatus::Error => self.error.clone(),
            AnalysisStatus::Idle | AnalysisStatus::Analyzing => None,
        }
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::idle()
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
