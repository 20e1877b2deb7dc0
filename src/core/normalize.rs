use crate::core::roi::split_tokens;
use crate::domain::model::FeatureVector;
use crate::utils::error::{ReconError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Added to every standard deviation before dividing.
pub const STD_EPSILON: f32 = 1e-6;

/// Per-dimension training statistics used to standardize raw features.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl NormalizationStats {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(ReconError::config(format!(
                "input mean/std length differ: mean has {}, std has {}",
                mean.len(),
                std.len()
            )));
        }
        Ok(Self { mean, std })
    }

    /// Load both vectors and check they match the foreground ROI count.
    pub fn load(mean_path: &Path, std_path: &Path, expected_len: usize) -> Result<Self> {
        let mean = load_vector(mean_path)?;
        let std = load_vector(std_path)?;
        if mean.len() != expected_len || std.len() != expected_len {
            return Err(ReconError::config(format!(
                "input_mean/std must have shape ({},), got ({},) and ({},)",
                expected_len,
                mean.len(),
                std.len()
            )));
        }
        tracing::debug!("Loaded normalization stats with {} dimensions", expected_len);
        Self::new(mean, std)
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    pub fn std(&self) -> &[f32] {
        &self.std
    }
}

/// `(value - mean[i]) / (std[i] + 1e-6)` for every dimension.
pub fn normalize(features: &FeatureVector, stats: &NormalizationStats) -> Result<FeatureVector> {
    check_dim(features, stats)?;
    let values = features
        .as_slice()
        .iter()
        .zip(stats.mean.iter().zip(&stats.std))
        .map(|(v, (m, s))| (v - m) / (s + STD_EPSILON))
        .collect();
    Ok(FeatureVector::new(values))
}

/// Inverse of [`normalize`].
pub fn denormalize(
    normalized: &FeatureVector,
    stats: &NormalizationStats,
) -> Result<FeatureVector> {
    check_dim(normalized, stats)?;
    let values = normalized
        .as_slice()
        .iter()
        .zip(stats.mean.iter().zip(&stats.std))
        .map(|(v, (m, s))| v * (s + STD_EPSILON) + m)
        .collect();
    Ok(FeatureVector::new(values))
}

fn check_dim(features: &FeatureVector, stats: &NormalizationStats) -> Result<()> {
    if features.len() != stats.dim() {
        return Err(ReconError::dimension(
            "feature normalization",
            stats.dim(),
            features.len(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vector file loaders
// ---------------------------------------------------------------------------

/// Load a 1-D numeric vector. Dispatch by extension:
/// * `.npy`  - NumPy array, little-endian float32/float64
/// * `.json` - `[1.0, 2.0, ...]`
/// * other   - numeric tokens separated by commas or whitespace
pub fn load_vector(path: &Path) -> Result<Vec<f32>> {
    if !path.exists() {
        return Err(ReconError::config(format!(
            "normalization file not found: {}",
            path.display()
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let bytes = std::fs::read(path)?;
    let parsed = match ext.as_str() {
        "npy" => parse_npy(&bytes),
        "json" => serde_json::from_slice::<Vec<f32>>(&bytes).map_err(ReconError::from),
        _ => parse_text_vector(&String::from_utf8_lossy(&bytes)),
    };
    parsed.map_err(|e| {
        ReconError::config(format!("failed to load {}: {}", path.display(), e))
    })
}

fn parse_text_vector(text: &str) -> Result<Vec<f32>> {
    text.lines()
        .flat_map(split_tokens)
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|_| ReconError::config(format!("'{}' is not a number", tok)))
        })
        .collect()
}

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

static NPY_DESCR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'descr'\s*:\s*'([^']+)'").expect("valid descr pattern"));
static NPY_FORTRAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("valid order pattern"));
static NPY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("valid shape pattern"));

/// Minimal `.npy` reader for the 1-D float vectors written by `np.save`.
pub(crate) fn parse_npy(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(ReconError::config("not a .npy file (bad magic)"));
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        other => {
            return Err(ReconError::config(format!(
                "unsupported .npy version {}",
                other
            )))
        }
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(ReconError::config(".npy header is truncated"));
    }
    let header = String::from_utf8_lossy(&bytes[header_start..data_start]);

    let descr = NPY_DESCR
        .captures(&header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| ReconError::config(".npy header has no descr"))?;
    if NPY_FORTRAN
        .captures(&header)
        .is_some_and(|c| &c[1] == "True")
    {
        return Err(ReconError::config("fortran-ordered .npy arrays are not supported"));
    }
    let shape = NPY_SHAPE
        .captures(&header)
        .ok_or_else(|| ReconError::config(".npy header has no shape"))?;
    let dims = shape[1]
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<usize>()
                .map_err(|_| ReconError::config(format!("invalid .npy dimension '{}'", d)))
        })
        .collect::<Result<Vec<usize>>>()?;
    if dims.iter().filter(|&&d| d != 1).count() > 1 {
        return Err(ReconError::config(format!(
            "expected a 1-D array, got shape {:?}",
            dims
        )));
    }
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| ReconError::config(format!(".npy shape {:?} is too large", dims)))?;

    let data = &bytes[data_start..];
    let values = match descr.as_str() {
        "<f4" | "=f4" => decode_le(data, count, 4, |b| {
            f32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })?,
        "<f8" | "=f8" => decode_le(data, count, 8, |b| {
            f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        })?,
        other => {
            return Err(ReconError::config(format!(
                "unsupported .npy dtype '{}'",
                other
            )))
        }
    };
    Ok(values)
}

fn decode_le(
    data: &[u8],
    count: usize,
    width: usize,
    f: impl Fn(&[u8]) -> f32,
) -> Result<Vec<f32>> {
    let expected = count
        .checked_mul(width)
        .ok_or_else(|| ReconError::config(format!(".npy element count {} is too large", count)))?;
    if data.len() != expected {
        return Err(ReconError::config(format!(
            ".npy data size mismatch: need {} bytes, got {}",
            expected,
            data.len()
        )));
    }
    Ok(data.chunks_exact(width).map(f).collect())
}
