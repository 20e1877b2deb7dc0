pub mod assets;
pub mod check;
pub mod engine;
pub mod features;
pub mod inference;
pub mod normalize;
pub mod pipeline;
pub mod roi;
pub mod spectrum;
pub mod stage;

pub use crate::domain::model::{CapturedImage, FeatureVector, OutputVector, Region, SpectrumResult};
pub use crate::domain::ports::{
    AssetProvider, ForwardModel, ImageSource, Pipeline, ResultSink, WavelengthMapping,
};
pub use crate::utils::error::Result;
