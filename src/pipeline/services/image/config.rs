use serde::Deserialize;

/// Configuration for color segmentation with tunable hue bands
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorSegmentationConfig {
    pub yellow_band: HueBand,
    pub green_band: HueBand,
    pub min_saturation: f32,
    pub min_value: f32,
    pub sample_step: u32,
}

/// Half-open hue interval in degrees, `min <= hue < max`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HueBand {
    pub min: f32,
    pub max: f32,
}

impl HueBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hue: f32) -> bool {
        hue >= self.min && hue < self.max
    }

    fn overlaps(&self, other: &HueBand) -> bool {
        self.min < other.max && other.min < self.max
    }
}

impl Default for ColorSegmentationConfig {
    fn default() -> Self {
        Self {
            yellow_band: HueBand::new(35.0, 70.0), // rust-yellow through olive
            green_band: HueBand::new(70.0, 170.0), // coating greens up to teal
            min_saturation: 0.25,                  // greys and whites are background
            min_value: 0.20,                       // shadows are background
            sample_step: 1,
        }
    }
}

impl ColorSegmentationConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        for (name, band) in [("yellow", &self.yellow_band), ("green", &self.green_band)] {
            if band.min < 0.0 || band.max > 360.0 || band.min >= band.max {
                return Err(format!(
                    "The {name} hue band must satisfy 0 <= min < max <= 360"
                ));
            }
        }

        if self.yellow_band.overlaps(&self.green_band) {
            return Err("Yellow and green hue bands must not overlap".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_saturation) {
            return Err("Minimum saturation must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_value) {
            return Err("Minimum value must be between 0.0 and 1.0".to_string());
        }

        if self.sample_step == 0 {
            return Err("Sample step must be greater than 0".to_string());
        }

        Ok(())
    }
}
