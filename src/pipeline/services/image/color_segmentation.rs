use image::{Rgb, RgbImage};
use std::time::Instant;
use tracing::debug;

use super::config::ColorSegmentationConfig;
use crate::pipeline::types::{ClassCounts, Classification, PixelClass, PixelCounts};

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

pub fn rgb_to_hsv(px: &Rgb<u8>) -> Hsv {
    let r = px[0] as f32 / 255.0;
    let g = px[1] as f32 / 255.0;
    let b = px[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    Hsv {
        hue: hue.rem_euclid(360.0),
        saturation,
        value: max,
    }
}

/// Splits a surface photograph into corroded (yellow), healthy (green) and
/// background pixels.
#[derive(Debug, Clone, Default)]
pub struct ColorSegmentationClassifier {
    config: ColorSegmentationConfig,
}

impl ColorSegmentationClassifier {
    pub fn new(config: ColorSegmentationConfig) -> Self {
        Self { config }
    }

    pub fn classify_pixel(&self, px: &Rgb<u8>) -> PixelClass {
        let hsv = rgb_to_hsv(px);
        if hsv.saturation < self.config.min_saturation || hsv.value < self.config.min_value {
            return PixelClass::Background;
        }

        if self.config.yellow_band.contains(hsv.hue) {
            PixelClass::Corroded
        } else if self.config.green_band.contains(hsv.hue) {
            PixelClass::Healthy
        } else {
            PixelClass::Background
        }
    }

    pub fn classify(&self, image: &RgbImage) -> Classification {
        let start = Instant::now();
        let step = self.config.sample_step.max(1) as usize;
        let mut counts = PixelCounts::default();

        for y in (0..image.height()).step_by(step) {
            for x in (0..image.width()).step_by(step) {
                counts.record(self.classify_pixel(image.get_pixel(x, y)));
            }
        }

        let classification =
            Classification::from_counts(ClassCounts::Pixels(counts)).with_timing(start);

        debug!(
            "Color segmentation of {}x{} image: {} corroded, {} healthy, {} background in {}us",
            image.width(),
            image.height(),
            counts.corroded,
            counts.healthy,
            counts.background,
            classification.processing_time_us
        );

        classification
    }
}
