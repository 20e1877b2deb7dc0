use crate::domain::model::{OutputVector, SpectrumResult};
use crate::domain::ports::WavelengthMapping;
use crate::utils::error::{ReconError, Result};
use std::path::Path;

pub const DEFAULT_MIN_WAVELENGTH: f64 = 400.0;
pub const DEFAULT_MAX_WAVELENGTH: f64 = 1000.0;

/// Evenly spaced wavelengths over `[min, max]`, both ends included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRange {
    pub min: f64,
    pub max: f64,
}

impl Default for LinearRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_WAVELENGTH,
            max: DEFAULT_MAX_WAVELENGTH,
        }
    }
}

impl WavelengthMapping for LinearRange {
    fn wavelengths(&self, count: usize) -> Result<Vec<f64>> {
        Ok(match count {
            0 => Vec::new(),
            1 => vec![self.min],
            n => {
                let step = (self.max - self.min) / (n - 1) as f64;
                (0..n).map(|i| self.min + step * i as f64).collect()
            }
        })
    }
}

/// Per-channel wavelengths read from a calibration file.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    wavelengths: Vec<f64>,
}

impl CalibrationTable {
    pub fn new(wavelengths: Vec<f64>) -> Self {
        Self { wavelengths }
    }

    /// One wavelength per row in the first column; rows that do not parse
    /// (e.g. a header) are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReconError::config(format!(
                "calibration file not found: {}",
                path.display()
            )));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut wavelengths = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(value) = record.get(0).and_then(|v| v.parse::<f64>().ok()) {
                wavelengths.push(value);
            }
        }
        if wavelengths.is_empty() {
            return Err(ReconError::config(format!(
                "calibration file {} contains no wavelengths",
                path.display()
            )));
        }
        tracing::debug!(
            "Loaded {} calibration wavelengths from {}",
            wavelengths.len(),
            path.display()
        );
        Ok(Self { wavelengths })
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }
}

impl WavelengthMapping for CalibrationTable {
    fn wavelengths(&self, count: usize) -> Result<Vec<f64>> {
        if count != self.wavelengths.len() {
            return Err(ReconError::dimension(
                "wavelength calibration",
                self.wavelengths.len(),
                count,
            ));
        }
        Ok(self.wavelengths.clone())
    }
}

/// Packages a model output as a labelled spectrum.
pub struct SpectrumBuilder {
    mapping: Box<dyn WavelengthMapping>,
}

impl SpectrumBuilder {
    pub fn new(mapping: Box<dyn WavelengthMapping>) -> Self {
        Self { mapping }
    }

    pub fn build(&self, output: &OutputVector) -> Result<SpectrumResult> {
        let wavelengths = self.mapping.wavelengths(output.len())?;
        let intensities: Vec<f64> = output.as_slice().iter().map(|&v| f64::from(v)).collect();
        if wavelengths.len() != intensities.len() {
            return Err(ReconError::dimension(
                "spectrum wavelengths",
                intensities.len(),
                wavelengths.len(),
            ));
        }
        Ok(SpectrumResult {
            wavelengths,
            intensities,
        })
    }
}

impl Default for SpectrumBuilder {
    fn default() -> Self {
        Self::new(Box::new(LinearRange::default()))
    }
}

/// Build with a linear range, or the 400-1000 nm default when none is given.
pub fn build(
    output: &OutputVector,
    wavelength_range: Option<(f64, f64)>,
) -> Result<SpectrumResult> {
    let range = wavelength_range
        .map(|(min, max)| LinearRange { min, max })
        .unwrap_or_default();
    SpectrumBuilder::new(Box::new(range)).build(output)
}
