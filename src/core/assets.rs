use crate::core::inference::InferenceEngine;
use crate::core::normalize::NormalizationStats;
use crate::core::roi::RoiCatalog;
use crate::domain::ports::{AssetProvider, ForwardModel};
use crate::utils::error::Result;
use once_cell::sync::OnceCell;

/// Immutable assets loaded on first use and shared read-only afterwards.
///
/// Each asset sits behind its own `OnceCell`: concurrent first callers block on a
/// single load, and a failed load is not cached so the next call tries again.
pub struct AssetCache<A: AssetProvider> {
    provider: A,
    catalog: OnceCell<RoiCatalog>,
    stats: OnceCell<NormalizationStats>,
    engine: InferenceEngine,
}

impl<A: AssetProvider> AssetCache<A> {
    pub fn new(provider: A) -> Self {
        Self {
            provider,
            catalog: OnceCell::new(),
            stats: OnceCell::new(),
            engine: InferenceEngine::new(),
        }
    }

    pub fn provider(&self) -> &A {
        &self.provider
    }

    pub fn catalog(&self) -> Result<&RoiCatalog> {
        self.catalog.get_or_try_init(|| {
            RoiCatalog::load(
                &self.provider.roi_path(),
                &self.provider.background_path(),
                self.provider.required_regions(),
            )
        })
    }

    pub fn stats(&self) -> Result<&NormalizationStats> {
        self.stats.get_or_try_init(|| {
            NormalizationStats::load(
                &self.provider.mean_path(),
                &self.provider.std_path(),
                self.provider.required_regions(),
            )
        })
    }

    pub fn model(&self) -> Result<&dyn ForwardModel> {
        self.engine
            .load(&self.provider.weights_path(), &self.provider.model_options())
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Load every asset; a no-op once all of them are cached.
    pub fn load_all(&self) -> Result<()> {
        let catalog = self.catalog()?;
        self.stats()?;
        let model = self.model()?;
        tracing::debug!(
            "Assets ready: {} ROIs, model {} -> {}",
            catalog.len(),
            model.input_dim(),
            model.output_dim()
        );
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.catalog.get().is_some() && self.stats.get().is_some() && self.engine.is_loaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::core::inference::tests::small_model_json;
    use crate::utils::error::ErrorKind;
    use std::sync::Arc;

    fn config_for(dir: &std::path::Path) -> ReconConfig {
        let mut config = ReconConfig::default();
        config.assets.model_dir = dir.to_string_lossy().into_owned();
        config.assets.mean_file = "mean.txt".to_string();
        config.assets.std_file = "std.txt".to_string();
        config.extract.required_regions = 2;
        config
    }

    fn write_assets(dir: &std::path::Path) {
        std::fs::write(dir.join("rois.txt"), "0,0,2,2\n2,2,2,2\n").unwrap();
        std::fs::write(dir.join("bgrois.txt"), "0,0,4,4,50\n").unwrap();
        std::fs::write(dir.join("mean.txt"), "1 1").unwrap();
        std::fs::write(dir.join("std.txt"), "1 1").unwrap();
        std::fs::write(dir.join("model.json"), small_model_json().to_string()).unwrap();
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(config_for(dir.path()));

        let err = cache.load_all().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!cache.is_loaded());

        write_assets(dir.path());
        cache.load_all().unwrap();
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_assets_are_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let cache = AssetCache::new(config_for(dir.path()));
        cache.load_all().unwrap();

        // later edits are not picked up by an already loaded cache
        std::fs::write(dir.path().join("bgrois.txt"), "0,0,4,4,25\n").unwrap();
        assert_eq!(cache.catalog().unwrap().background_value(), 50.0);
    }

    #[test]
    fn test_concurrent_first_use() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let cache = Arc::new(AssetCache::new(config_for(dir.path())));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.catalog().map(|c| c as *const RoiCatalog as usize))
            })
            .collect();
        let addresses: Vec<usize> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }
}
