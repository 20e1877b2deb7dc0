use crate::core::inference::DEFAULT_OUTPUT_LAYER;
use crate::core::spectrum::{
    CalibrationTable, LinearRange, DEFAULT_MAX_WAVELENGTH, DEFAULT_MIN_WAVELENGTH,
};
use crate::domain::ports::{AssetProvider, WavelengthMapping};
use crate::utils::error::{ReconError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REQUIRED_REGIONS: usize = 32;
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub assets: AssetsConfig,
    pub extract: ExtractConfig,
    pub model: ModelConfig,
    pub spectrum: SpectrumConfig,
    pub workspace: WorkspaceConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub model_dir: String,
    pub roi_file: String,
    pub background_file: String,
    pub mean_file: String,
    pub std_file: String,
    pub weights_file: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            model_dir: "src/models".to_string(),
            roi_file: "rois.txt".to_string(),
            background_file: "bgrois.txt".to_string(),
            mean_file: "input_mean.npy".to_string(),
            std_file: "input_std.npy".to_string(),
            weights_file: "model.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub required_regions: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            required_regions: DEFAULT_REQUIRED_REGIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub output_layer: String,
    pub fallback_output_dim: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            output_layer: DEFAULT_OUTPUT_LAYER.to_string(),
            fallback_output_dim: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub min_wavelength: f64,
    pub max_wavelength: f64,
    pub calibration_file: Option<String>,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            min_wavelength: DEFAULT_MIN_WAVELENGTH,
            max_wavelength: DEFAULT_MAX_WAVELENGTH,
            calibration_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub capture_dir: String,
    pub result_dir: String,
    pub capture_timeout_seconds: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            capture_dir: "capture".to_string(),
            result_dir: "result".to_string(),
            capture_timeout_seconds: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// Level for this crate's logs when neither `RUST_LOG` nor `--verbose` is set
    pub log_level: Option<String>,
}

impl ReconConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ReconError::config(format!(
                "cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "Config file {} not found, using built-in defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReconError::InvalidConfigValueError {
            field: "toml_parsing".to_string(),
            value: String::new(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})
    fn substitute_env_vars(content: &str) -> String {
        use once_cell::sync::Lazy;
        use regex::Regex;
        static ENV_VAR: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let assets = &self.assets;
        validation::validate_path("assets.model_dir", &assets.model_dir)?;
        validation::validate_path("assets.roi_file", &assets.roi_file)?;
        validation::validate_path("assets.background_file", &assets.background_file)?;
        validation::validate_path("assets.mean_file", &assets.mean_file)?;
        validation::validate_path("assets.std_file", &assets.std_file)?;
        validation::validate_path("assets.weights_file", &assets.weights_file)?;

        validation::validate_positive_number(
            "extract.required_regions",
            self.extract.required_regions,
            1,
        )?;

        validation::validate_non_empty_string("model.output_layer", &self.model.output_layer)?;
        if let Some(dim) = self.model.fallback_output_dim {
            validation::validate_positive_number("model.fallback_output_dim", dim, 1)?;
        }

        validation::validate_ordered_pair(
            "spectrum.min_wavelength..max_wavelength",
            self.spectrum.min_wavelength,
            self.spectrum.max_wavelength,
        )?;
        if let Some(calibration) = &self.spectrum.calibration_file {
            validation::validate_path("spectrum.calibration_file", calibration)?;
        }

        validation::validate_path("workspace.capture_dir", &self.workspace.capture_dir)?;
        validation::validate_path("workspace.result_dir", &self.workspace.result_dir)?;
        validation::validate_range(
            "workspace.capture_timeout_seconds",
            self.workspace.capture_timeout_seconds,
            0.0,
            3600.0,
        )?;
        if let Some(level) = &self.monitoring.log_level {
            validation::validate_one_of("monitoring.log_level", level, &LOG_LEVELS)?;
        }

        Ok(())
    }

    fn resolve(&self, file: &str) -> PathBuf {
        Path::new(&self.assets.model_dir).join(file)
    }

    pub fn capture_dir(&self) -> PathBuf {
        PathBuf::from(&self.workspace.capture_dir)
    }

    pub fn result_dir(&self) -> PathBuf {
        PathBuf::from(&self.workspace.result_dir)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.workspace.capture_timeout_seconds.max(0.0))
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// Calibration table when configured, otherwise the linear range.
    pub fn wavelength_mapping(&self) -> Result<Box<dyn WavelengthMapping>> {
        match &self.spectrum.calibration_file {
            Some(file) => Ok(Box::new(CalibrationTable::load(&self.resolve(file))?)),
            None => Ok(Box::new(LinearRange {
                min: self.spectrum.min_wavelength,
                max: self.spectrum.max_wavelength,
            })),
        }
    }
}

impl AssetProvider for ReconConfig {
    fn roi_path(&self) -> PathBuf {
        self.resolve(&self.assets.roi_file)
    }

    fn background_path(&self) -> PathBuf {
        self.resolve(&self.assets.background_file)
    }

    fn mean_path(&self) -> PathBuf {
        self.resolve(&self.assets.mean_file)
    }

    fn std_path(&self) -> PathBuf {
        self.resolve(&self.assets.std_file)
    }

    fn weights_path(&self) -> PathBuf {
        self.resolve(&self.assets.weights_file)
    }

    fn required_regions(&self) -> usize {
        self.extract.required_regions
    }

    fn output_layer(&self) -> &str {
        &self.model.output_layer
    }

    fn fallback_output_dim(&self) -> Option<usize> {
        self.model.fallback_output_dim
    }
}

impl Validate for ReconConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
