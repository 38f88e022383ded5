use image::ImageFormat;
use serde::Deserialize;
use tracing::{debug, warn};

use super::grid_reader::{self, GridData};
use super::upload::Upload;
use crate::error::AnalysisError;
use crate::pipeline::types::{CScanGrid, DataType, RawInput};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif"];
const GRID_EXTENSIONS: [&str; 4] = ["csv", "txt", "dat", "xlsx"];

const IMAGE_MIME_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "image/x-ms-bmp",
    "image/tiff",
    "image/gif",
];
const GRID_MIME_TYPES: [&str; 5] = [
    "text/csv",
    "text/plain",
    "application/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];
const GENERIC_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub max_payload_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl IntakeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_payload_bytes == 0 {
            return Err("Maximum payload size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Turns uploaded bytes into a typed analysis input, or fails without
/// producing anything.
#[derive(Debug, Clone, Default)]
pub struct InputAdapter {
    config: IntakeConfig,
    default_nominal_thickness: Option<f64>,
}

impl InputAdapter {
    pub fn new(config: IntakeConfig) -> Self {
        Self {
            config,
            default_nominal_thickness: None,
        }
    }

    pub fn with_default_nominal_thickness(mut self, nominal: Option<f64>) -> Self {
        self.default_nominal_thickness = nominal;
        self
    }

    pub fn load(&self, upload: &Upload, kind: DataType) -> Result<RawInput, AnalysisError> {
        self.check(upload, kind)?;
        self.decode(upload, kind)
    }

    /// Format and size checks only; cheap enough to run on the submitting task.
    pub fn check(&self, upload: &Upload, kind: DataType) -> Result<(), AnalysisError> {
        self.check_format(upload, kind)?;
        self.check_size(upload)
    }

    /// Decodes an upload that already passed [`InputAdapter::check`].
    pub fn decode(&self, upload: &Upload, kind: DataType) -> Result<RawInput, AnalysisError> {
        let extension = upload.extension().unwrap_or_default();
        let input = match kind {
            DataType::Image => self.decode_image(upload, &extension)?,
            DataType::CScan => self.decode_grid(upload, &extension)?,
        };

        debug!(
            "Loaded {} ({} bytes) as {}",
            upload.file_name,
            upload.size(),
            kind
        );
        Ok(input)
    }

    fn check_format(&self, upload: &Upload, kind: DataType) -> Result<(), AnalysisError> {
        let (extensions, mime_types): (&[&str], &[&str]) = match kind {
            DataType::Image => (IMAGE_EXTENSIONS.as_slice(), IMAGE_MIME_TYPES.as_slice()),
            DataType::CScan => (GRID_EXTENSIONS.as_slice(), GRID_MIME_TYPES.as_slice()),
        };

        upload
            .extension()
            .filter(|ext| extensions.contains(&ext.as_str()))
            .ok_or_else(|| {
                AnalysisError::InvalidFormat(format!(
                    "'{}' is not a supported {} file (expected one of: {})",
                    upload.file_name,
                    kind.label(),
                    extensions.join(", ")
                ))
            })?;

        if let Some(mime) = upload.mime.as_deref() {
            let mime = mime.trim().to_ascii_lowercase();
            if mime != GENERIC_MIME && !mime_types.contains(&mime.as_str()) {
                return Err(AnalysisError::InvalidFormat(format!(
                    "MIME type '{mime}' is not accepted for {} uploads",
                    kind.label()
                )));
            }
        }

        Ok(())
    }

    fn check_size(&self, upload: &Upload) -> Result<(), AnalysisError> {
        let limit = self.config.max_payload_bytes;
        if let Some(declared) = upload.declared_size {
            if declared != upload.size() as u64 {
                warn!(
                    "{} declared {} bytes but carries {}",
                    upload.file_name,
                    declared,
                    upload.size()
                );
            }
        }

        if upload.size() > limit {
            return Err(AnalysisError::FileTooLarge {
                size: upload.size(),
                limit,
            });
        }
        Ok(())
    }

    fn decode_image(&self, upload: &Upload, extension: &str) -> Result<RawInput, AnalysisError> {
        let format = ImageFormat::from_extension(extension).ok_or_else(|| {
            AnalysisError::InvalidFormat(format!("no image decoder for '.{extension}'"))
        })?;
        let image = image::load_from_memory_with_format(&upload.bytes, format)
            .map_err(|e| {
                AnalysisError::DecodeFailure(format!("cannot decode {}: {e}", upload.file_name))
            })?
            .to_rgb8();

        if image.width() == 0 || image.height() == 0 {
            return Err(AnalysisError::DecodeFailure(format!(
                "{} has no pixels",
                upload.file_name
            )));
        }
        Ok(RawInput::image(image))
    }

    fn decode_grid(&self, upload: &Upload, extension: &str) -> Result<RawInput, AnalysisError> {
        let data = match extension {
            "xlsx" => grid_reader::read_xlsx_grid(&upload.bytes)?,
            _ => grid_reader::read_text_grid(&upload.bytes)?,
        };
        let nominal = self.resolve_nominal(&data);
        let grid = CScanGrid::new(data.rows, data.cols, data.samples, nominal)?;
        Ok(RawInput::cscan(grid))
    }

    fn resolve_nominal(&self, data: &GridData) -> f64 {
        data.nominal_thickness
            .or(self.default_nominal_thickness)
            .or_else(|| data.max_sample())
            .unwrap_or(0.0)
    }
}
