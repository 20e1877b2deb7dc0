use crate::core::stage::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input error: {message}")]
    InputError { message: String },

    #[error("Image decode error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Model load error: {message}")]
    ModelLoadError { message: String },

    #[error("Runtime error: {message}")]
    RuntimeError { message: String },

    #[error("Image acquisition timed out after {seconds:.1}s")]
    AcquisitionTimeout { seconds: f64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("{stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<ReconError>,
    },
}

/// 錯誤種類，對應重建流程對外公開的失敗類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    DimensionMismatch,
    ModelLoad,
    Runtime,
    AcquisitionTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReconError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoadError {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::RuntimeError {
            message: message.into(),
        }
    }

    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// 將錯誤標記為在指定階段失敗；已標記者保持原階段
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::StageFailed { .. } => already,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::SerializationError(_) => ErrorKind::Configuration,
            Self::InputError { .. } | Self::ImageError(_) => ErrorKind::Input,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::ModelLoadError { .. } => ErrorKind::ModelLoad,
            Self::RuntimeError { .. } | Self::IoError(_) | Self::CsvError(_) => ErrorKind::Runtime,
            Self::AcquisitionTimeout { .. } => ErrorKind::AcquisitionTimeout,
            Self::StageFailed { source, .. } => source.kind(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::AcquisitionTimeout => ErrorSeverity::Medium,
            ErrorKind::Input | ErrorKind::DimensionMismatch => ErrorSeverity::High,
            ErrorKind::Runtime => ErrorSeverity::High,
            ErrorKind::Configuration | ErrorKind::ModelLoad => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => {
                "Check the ROI files, normalization vectors and config paths under [assets]"
            }
            ErrorKind::Input => "Recapture the image and make sure it is a readable PNG/JPEG",
            ErrorKind::DimensionMismatch => {
                "Make sure the ROI count, normalization vectors and model were trained together"
            }
            ErrorKind::ModelLoad => {
                "Verify the model weight file exists and matches the expected layout"
            }
            ErrorKind::Runtime => {
                "Retry the reconstruction; if it persists run the `check` command"
            }
            ErrorKind::AcquisitionTimeout => "Capture a new image and run the reconstruction again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.stage() {
            Some(stage) => format!(
                "Reconstruction failed while {}: {}",
                stage.describe(),
                self.root()
            ),
            None => self.to_string(),
        }
    }

    fn root(&self) -> &ReconError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wrapping_keeps_kind() {
        let err = ReconError::dimension("normalize", 32, 31).at_stage(Stage::Normalizing);
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert_eq!(err.stage(), Some(Stage::Normalizing));
        assert!(err.user_friendly_message().contains("expected 32, got 31"));
    }

    #[test]
    fn test_stage_wrapping_is_not_nested() {
        let err = ReconError::config("missing rois")
            .at_stage(Stage::LoadingAssets)
            .at_stage(Stage::Inferring);
        assert_eq!(err.stage(), Some(Stage::LoadingAssets));
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            ReconError::AcquisitionTimeout { seconds: 5.0 }.severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(ReconError::model_load("x").severity(), ErrorSeverity::Critical);
        assert_eq!(ReconError::input("x").severity(), ErrorSeverity::High);
    }
}
