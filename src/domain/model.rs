use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Integer rectangle in image pixel space. `width` and `height` are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Intersection with a `img_width` x `img_height` image as `(x0, y0, x1, y1)`,
    /// half-open. `None` when the intersection is empty.
    pub fn clip(&self, img_width: u32, img_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(i64::from(img_width));
        let y1 = self.y.saturating_add(self.height).min(i64::from(img_height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Ordered per-region features, one value per foreground ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Raw model output, length `O`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputVector {
    values: Vec<f32>,
}

impl OutputVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Reconstructed spectrum: paired wavelength / intensity sequences of equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumResult {
    pub wavelengths: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl SpectrumResult {
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    /// Wavelength and intensity of the strongest sample.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.wavelengths
            .iter()
            .zip(&self.intensities)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(w, i)| (*w, *i))
    }
}

/// Prefix of the layer whose weight rows define the output dimension.
pub const DEFAULT_OUTPUT_LAYER: &str = "fc";

/// How a forward model is loaded: expected input width, output layer, fallback output size.
#[derive(Debug, Clone)]
pub struct ModelLoadOptions {
    pub input_dim: usize,
    pub output_layer: String,
    pub fallback_output_dim: Option<usize>,
}

impl ModelLoadOptions {
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            output_layer: DEFAULT_OUTPUT_LAYER.to_string(),
            fallback_output_dim: None,
        }
    }
}

/// A decoded gray-scale capture together with where it came from.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub origin: PathBuf,
    pub pixels: GrayImage,
}

impl CapturedImage {
    pub fn new(origin: impl Into<PathBuf>, pixels: GrayImage) -> Self {
        Self {
            origin: origin.into(),
            pixels,
        }
    }

    /// File stem of the origin, used to name derived outputs.
    pub fn stem(&self) -> String {
        self.origin
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "capture".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_rejects_non_positive_size() {
        assert!(Region::new(0, 0, 0, 5).is_none());
        assert!(Region::new(0, 0, 5, -1).is_none());
        assert!(Region::new(-3, 2, 1, 1).is_some());
    }

    #[test]
    fn test_region_clip() {
        let region = Region::new(-2, 3, 5, 10).unwrap();
        assert_eq!(region.clip(8, 6), Some((0, 3, 3, 6)));

        let outside = Region::new(20, 20, 4, 4).unwrap();
        assert_eq!(outside.clip(8, 6), None);

        let left_of_image = Region::new(-10, 0, 10, 4).unwrap();
        assert_eq!(left_of_image.clip(8, 6), None);
    }

    #[test]
    fn test_spectrum_peak() {
        let spectrum = SpectrumResult {
            wavelengths: vec![400.0, 500.0, 600.0],
            intensities: vec![0.1, 0.9, 0.4],
        };
        assert_eq!(spectrum.peak(), Some((500.0, 0.9)));
    }

    #[test]
    fn test_model_load_options_defaults() {
        let options = ModelLoadOptions::new(32);
        assert_eq!(options.input_dim, 32);
        assert_eq!(options.output_layer, DEFAULT_OUTPUT_LAYER);
        assert_eq!(options.fallback_output_dim, None);
    }
}
