use crate::domain::model::{
    CapturedImage, FeatureVector, ModelLoadOptions, OutputVector, SpectrumResult,
};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Supplies a decoded gray-scale capture. How it was acquired is not our concern.
pub trait ImageSource {
    fn acquire(&self) -> Result<CapturedImage>;
}

/// Receives a finished spectrum and returns where it was stored.
pub trait ResultSink {
    fn write(&self, origin: &Path, spectrum: &SpectrumResult) -> Result<PathBuf>;
}

/// Resolves the persisted assets the reconstruction needs.
pub trait AssetProvider: Send + Sync {
    fn roi_path(&self) -> PathBuf;
    fn background_path(&self) -> PathBuf;
    fn mean_path(&self) -> PathBuf;
    fn std_path(&self) -> PathBuf;
    fn weights_path(&self) -> PathBuf;
    fn required_regions(&self) -> usize;
    fn output_layer(&self) -> &str;
    fn fallback_output_dim(&self) -> Option<usize>;

    fn model_options(&self) -> ModelLoadOptions {
        ModelLoadOptions {
            input_dim: self.required_regions(),
            output_layer: self.output_layer().to_string(),
            fallback_output_dim: self.fallback_output_dim(),
        }
    }
}

/// Fixed-shape numeric model: `forward(vector[F]) -> vector[O]`.
pub trait ForwardModel: Send + Sync {
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;
    fn forward(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Maps output positions to wavelengths.
pub trait WavelengthMapping: Send + Sync {
    fn wavelengths(&self, count: usize) -> Result<Vec<f64>>;
}

/// The reconstruction stages, sequenced by the engine.
pub trait Pipeline: Send + Sync {
    fn load_assets(&self) -> Result<()>;
    fn extract(&self, image: &CapturedImage) -> Result<FeatureVector>;
    fn normalize(&self, features: FeatureVector) -> Result<FeatureVector>;
    fn infer(&self, normalized: &FeatureVector) -> Result<OutputVector>;
    fn build(&self, output: OutputVector) -> Result<SpectrumResult>;
}
