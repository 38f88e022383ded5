use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inspection dataset a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Image,
    CScan,
}

impl DataType {
    pub fn label(&self) -> &'static str {
        match self {
            DataType::Image => "image",
            DataType::CScan => "C-Scan",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DataType::Image => {
                "Detects yellow (corroded) versus green (healthy) areas of a surface photograph."
            }
            DataType::CScan => {
                "Compares C-scan thickness samples against the nominal wall thickness to find material loss."
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
