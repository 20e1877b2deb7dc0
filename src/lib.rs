pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::ReconConfig;

pub use adapters::{CaptureDirectory, CsvResultSink, FileImageSource};
pub use core::{
    check::{check_assets, AssetReport},
    engine::{ReconEngine, RunSummary},
    pipeline::SpectralPipeline,
};
pub use domain::model::SpectrumResult;
pub use utils::error::{ErrorKind, ReconError, Result};
