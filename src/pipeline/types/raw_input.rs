use crate::error::AnalysisError;
use crate::pipeline::types::DataType;
use image::RgbImage;
use std::sync::Arc;

/// Decoded analysis input. Cloning shares the underlying buffers.
#[derive(Debug, Clone)]
pub enum RawInput {
    Image(Arc<RgbImage>),
    CScan(Arc<CScanGrid>),
}

impl RawInput {
    pub fn image(image: RgbImage) -> Self {
        RawInput::Image(Arc::new(image))
    }

    pub fn cscan(grid: CScanGrid) -> Self {
        RawInput::CScan(Arc::new(grid))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            RawInput::Image(_) => DataType::Image,
            RawInput::CScan(_) => DataType::CScan,
        }
    }
}

/// Row-major grid of thickness measurements. Missing samples are stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CScanGrid {
    rows: usize,
    cols: usize,
    thickness: Vec<f64>,
    nominal_thickness: f64,
}

impl CScanGrid {
    pub fn new(
        rows: usize,
        cols: usize,
        thickness: Vec<f64>,
        nominal_thickness: f64,
    ) -> Result<Self, AnalysisError> {
        if rows.checked_mul(cols) != Some(thickness.len()) {
            return Err(AnalysisError::DecodeFailure(format!(
                "grid of {rows}x{cols} cannot hold {} samples",
                thickness.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            thickness,
            nominal_thickness,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nominal_thickness(&self) -> f64 {
        self.nominal_thickness
    }

    pub fn samples(&self) -> &[f64] {
        &self.thickness
    }

    pub fn sample(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.thickness.get(row * self.cols + col).copied()
    }
}
