use crate::config::ReconConfig;
use crate::core::assets::AssetCache;
use crate::core::spectrum::SpectrumBuilder;
use crate::core::{features, inference, normalize};
use crate::domain::model::{CapturedImage, FeatureVector, OutputVector, SpectrumResult};
use crate::domain::ports::{AssetProvider, Pipeline};
use crate::utils::error::Result;

/// ROI features -> normalization -> dense model -> wavelength-indexed spectrum.
pub struct SpectralPipeline<A: AssetProvider> {
    assets: AssetCache<A>,
    builder: SpectrumBuilder,
}

impl<A: AssetProvider> SpectralPipeline<A> {
    pub fn new(provider: A, builder: SpectrumBuilder) -> Self {
        Self {
            assets: AssetCache::new(provider),
            builder,
        }
    }

    pub fn assets(&self) -> &AssetCache<A> {
        &self.assets
    }
}

impl SpectralPipeline<ReconConfig> {
    /// 依配置建立管線 (波長對應由 [spectrum] 區段決定)
    pub fn from_config(config: ReconConfig) -> Result<Self> {
        let builder = SpectrumBuilder::new(config.wavelength_mapping()?);
        Ok(Self::new(config, builder))
    }
}

impl<A: AssetProvider> Pipeline for SpectralPipeline<A> {
    fn load_assets(&self) -> Result<()> {
        self.assets.load_all()
    }

    fn extract(&self, image: &CapturedImage) -> Result<FeatureVector> {
        let catalog = self.assets.catalog()?;
        let features = features::extract(&image.pixels, catalog)?;
        tracing::debug!(
            "Extracted {} features from {}x{} image",
            features.len(),
            image.pixels.width(),
            image.pixels.height()
        );
        Ok(features)
    }

    fn normalize(&self, features: FeatureVector) -> Result<FeatureVector> {
        let stats = self.assets.stats()?;
        normalize::normalize(&features, stats)
    }

    fn infer(&self, normalized: &FeatureVector) -> Result<OutputVector> {
        let model = self.assets.model()?;
        inference::infer(model, normalized)
    }

    fn build(&self, output: OutputVector) -> Result<SpectrumResult> {
        self.builder.build(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inference::tests::small_model_json;
    use crate::core::spectrum::LinearRange;
    use crate::utils::error::ErrorKind;
    use image::{GrayImage, Luma};

    fn pipeline_in(dir: &std::path::Path) -> SpectralPipeline<ReconConfig> {
        std::fs::write(dir.join("rois.txt"), "0,0,2,2\n2,2,2,2\n").unwrap();
        std::fs::write(dir.join("bgrois.txt"), "0,0,4,4,50\n").unwrap();
        std::fs::write(dir.join("mean.txt"), "1 0").unwrap();
        std::fs::write(dir.join("std.txt"), "1 1").unwrap();
        std::fs::write(dir.join("model.json"), small_model_json().to_string()).unwrap();

        let mut config = ReconConfig::default();
        config.assets.model_dir = dir.to_string_lossy().into_owned();
        config.assets.mean_file = "mean.txt".to_string();
        config.assets.std_file = "std.txt".to_string();
        config.extract.required_regions = 2;
        SpectralPipeline::new(
            config,
            SpectrumBuilder::new(Box::new(LinearRange { min: 400.0, max: 600.0 })),
        )
    }

    #[test]
    fn test_stages_compose() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        pipeline.load_assets().unwrap();

        let image = CapturedImage::new("a.png", GrayImage::from_pixel(4, 4, Luma([100u8])));
        let features = pipeline.extract(&image).unwrap();
        assert_eq!(features.as_slice(), &[2.0, 2.0]);

        let normalized = pipeline.normalize(features).unwrap();
        assert!((normalized.as_slice()[0] - 1.0).abs() < 1e-5);
        assert!((normalized.as_slice()[1] - 2.0).abs() < 1e-5);

        // layers.0: [1-2, 0.5+1-1] = relu([-1, 0.5]) = [0, 0.5]
        // fc: [0+1+0.1, 0, 0.25-0.2] = [1.1, 0, 0.05]
        let output = pipeline.infer(&normalized).unwrap();
        let expected = [1.1f32, 0.0, 0.05];
        for (got, want) in output.as_slice().iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{} vs {}", got, want);
        }

        let spectrum = pipeline.build(output).unwrap();
        assert_eq!(spectrum.wavelengths, vec![400.0, 500.0, 600.0]);
        assert_eq!(spectrum.len(), 3);
    }

    #[test]
    fn test_missing_asset_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        std::fs::remove_file(dir.path().join("std.txt")).unwrap();

        let err = pipeline.load_assets().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
