use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::error::AppError;
use crate::intake::IntakeConfig;
use crate::pipeline::services::{ColorSegmentationConfig, ThicknessConfig};

const DEFAULT_CONFIG_FILE: &str = "corroscan";
const ENV_PREFIX: &str = "CORROSCAN";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub intake: IntakeConfig,
    pub color: ColorSegmentationConfig,
    pub thickness: ThicknessConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound for one classification, 0 disables it.
    pub classification_timeout_ms: u64,
    pub notification_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            classification_timeout_ms: 30_000,
            notification_capacity: 16,
        }
    }
}

impl OrchestratorConfig {
    pub fn classification_timeout(&self) -> Option<Duration> {
        (self.classification_timeout_ms > 0)
            .then(|| Duration::from_millis(self.classification_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.notification_capacity == 0 {
            return Err("Notification capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Level, AppError> {
        Level::from_str(self.level.trim())
            .map_err(|_| AppError::InvalidSettings(format!("unknown log level '{}'", self.level)))
    }
}

impl Settings {
    /// Layers defaults, `corroscan.{toml,json,yaml}` from the working directory,
    /// an explicit file when given, then `CORROSCAN__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder =
            Config::builder().add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.intake
            .validate()
            .and_then(|_| self.color.validate())
            .and_then(|_| self.thickness.validate())
            .and_then(|_| self.orchestrator.validate())
            .map_err(AppError::InvalidSettings)?;
        self.logging.level()?;
        Ok(())
    }
}
