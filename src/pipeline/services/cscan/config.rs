use serde::Deserialize;

/// Thresholds for reading material loss out of a C-scan thickness grid
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThicknessConfig {
    /// Fractional loss at or above which a sample counts as corroded.
    pub corrosion_threshold: f64,
    /// Used when the grid file does not declare its own nominal thickness.
    pub default_nominal_thickness: Option<f64>,
}

impl Default for ThicknessConfig {
    fn default() -> Self {
        Self {
            corrosion_threshold: 0.10,
            default_nominal_thickness: None,
        }
    }
}

impl ThicknessConfig {
    pub fn with_threshold(mut self, corrosion_threshold: f64) -> Self {
        self.corrosion_threshold = corrosion_threshold;
        self
    }

    pub fn with_nominal_thickness(mut self, nominal: f64) -> Self {
        self.default_nominal_thickness = Some(nominal);
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(self.corrosion_threshold > 0.0 && self.corrosion_threshold <= 1.0) {
            return Err("Corrosion threshold must be in (0.0, 1.0]".to_string());
        }

        if let Some(nominal) = self.default_nominal_thickness {
            if !(nominal.is_finite() && nominal > 0.0) {
                return Err("Default nominal thickness must be a positive number".to_string());
            }
        }

        Ok(())
    }
}
