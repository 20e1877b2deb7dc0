use crate::core::stage::{RunState, Stage, StageTracker};
use crate::domain::model::SpectrumResult;
use crate::domain::ports::{ImageSource, Pipeline, ResultSink};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of a full acquire -> reconstruct -> store run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub origin: PathBuf,
    pub output: PathBuf,
    pub points: usize,
    pub peak_wavelength: Option<f64>,
    pub peak_intensity: Option<f64>,
    pub finished_at: DateTime<Utc>,
}

pub struct ReconEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReconEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Sequence every stage over one acquired image.
    pub fn reconstruct(&self, source: &dyn ImageSource) -> Result<SpectrumResult> {
        let mut tracker = StageTracker::new();
        self.reconstruct_tracked(source, &mut tracker)
            .map(|(_, spectrum)| spectrum)
    }

    /// Same as [`reconstruct`](Self::reconstruct), recording transitions in `tracker`.
    /// Any failure moves the tracker to `Failed` and carries the failing stage.
    pub fn reconstruct_tracked(
        &self,
        source: &dyn ImageSource,
        tracker: &mut StageTracker,
    ) -> Result<(PathBuf, SpectrumResult)> {
        let result = self.execute(source, tracker);
        if let Err(e) = &result {
            tracker.fail(e.kind());
            tracing::error!("❌ {} failed: {}", tracker.current_stage(), e);
        }
        result.map_err(|e| e.at_stage(tracker.current_stage()))
    }

    fn execute(
        &self,
        source: &dyn ImageSource,
        tracker: &mut StageTracker,
    ) -> Result<(PathBuf, SpectrumResult)> {
        tracker.advance();
        let image = source.acquire()?;
        tracing::info!("Acquired {}", image.origin.display());

        tracker.advance();
        self.pipeline.load_assets()?;
        self.monitor.log_stats("Assets loaded");

        tracker.advance();
        let features = self.pipeline.extract(&image)?;

        tracker.advance();
        let normalized = self.pipeline.normalize(features)?;

        tracker.advance();
        let output = self.pipeline.infer(&normalized)?;
        self.monitor.log_stats("Inference");

        tracker.advance();
        let spectrum = self.pipeline.build(output)?;

        tracker.advance();
        debug_assert_eq!(tracker.state(), RunState::At(Stage::Done));
        tracing::info!("Reconstructed {} spectrum points", spectrum.len());
        Ok((image.origin, spectrum))
    }

    /// Reconstruct and hand the spectrum to `sink`.
    pub fn run(&self, source: &dyn ImageSource, sink: &dyn ResultSink) -> Result<RunSummary> {
        let mut tracker = StageTracker::new();
        let (origin, spectrum) = self.reconstruct_tracked(source, &mut tracker)?;

        let output = sink.write(&origin, &spectrum)?;
        tracing::info!("📁 Spectrum saved to: {}", output.display());
        self.monitor.log_final_stats();

        let peak = spectrum.peak();
        Ok(RunSummary {
            origin,
            output,
            points: spectrum.len(),
            peak_wavelength: peak.map(|(w, _)| w),
            peak_intensity: peak.map(|(_, i)| i),
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CapturedImage, FeatureVector, OutputVector};
    use crate::utils::error::{ErrorKind, ReconError};
    use image::GrayImage;
    use std::path::Path;
    use std::sync::Mutex;

    struct StubSource;

    impl ImageSource for StubSource {
        fn acquire(&self) -> Result<CapturedImage> {
            Ok(CapturedImage::new("stub.png", GrayImage::new(2, 2)))
        }
    }

    struct TimedOutSource;

    impl ImageSource for TimedOutSource {
        fn acquire(&self) -> Result<CapturedImage> {
            Err(ReconError::AcquisitionTimeout { seconds: 0.5 })
        }
    }

    /// Fails at the given stage, succeeds everywhere else.
    struct StubPipeline {
        fail_at: Option<Stage>,
    }

    impl StubPipeline {
        fn check(&self, stage: Stage) -> Result<()> {
            match self.fail_at {
                Some(s) if s == stage => Err(ReconError::dimension("stub", 32, 31)),
                _ => Ok(()),
            }
        }
    }

    impl Pipeline for StubPipeline {
        fn load_assets(&self) -> Result<()> {
            self.check(Stage::LoadingAssets)
        }

        fn extract(&self, _image: &CapturedImage) -> Result<FeatureVector> {
            self.check(Stage::ExtractingFeatures)?;
            Ok(FeatureVector::new(vec![1.0, 2.0]))
        }

        fn normalize(&self, features: FeatureVector) -> Result<FeatureVector> {
            self.check(Stage::Normalizing)?;
            Ok(features)
        }

        fn infer(&self, normalized: &FeatureVector) -> Result<OutputVector> {
            self.check(Stage::Inferring)?;
            Ok(OutputVector::new(normalized.as_slice().to_vec()))
        }

        fn build(&self, output: OutputVector) -> Result<SpectrumResult> {
            self.check(Stage::BuildingResult)?;
            Ok(SpectrumResult {
                wavelengths: vec![400.0, 1000.0],
                intensities: output.as_slice().iter().map(|v| *v as f64).collect(),
            })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Mutex<Vec<(PathBuf, usize)>>,
    }

    impl ResultSink for MemorySink {
        fn write(&self, origin: &Path, spectrum: &SpectrumResult) -> Result<PathBuf> {
            self.written
                .lock()
                .unwrap()
                .push((origin.to_path_buf(), spectrum.len()));
            Ok(PathBuf::from("memory"))
        }
    }

    #[test]
    fn test_success_path_visits_every_stage() {
        let engine = ReconEngine::new(StubPipeline { fail_at: None });
        let mut tracker = StageTracker::new();
        let (origin, spectrum) = engine.reconstruct_tracked(&StubSource, &mut tracker).unwrap();

        assert_eq!(origin, PathBuf::from("stub.png"));
        assert_eq!(spectrum.intensities, vec![1.0, 2.0]);
        let visited: Vec<RunState> = tracker.history().to_vec();
        assert_eq!(
            visited,
            vec![
                RunState::At(Stage::Idle),
                RunState::At(Stage::AcquiringImage),
                RunState::At(Stage::LoadingAssets),
                RunState::At(Stage::ExtractingFeatures),
                RunState::At(Stage::Normalizing),
                RunState::At(Stage::Inferring),
                RunState::At(Stage::BuildingResult),
                RunState::At(Stage::Done),
            ]
        );
    }

    #[test]
    fn test_failure_identifies_stage() {
        for stage in [
            Stage::LoadingAssets,
            Stage::ExtractingFeatures,
            Stage::Normalizing,
            Stage::Inferring,
            Stage::BuildingResult,
        ] {
            let engine = ReconEngine::new(StubPipeline {
                fail_at: Some(stage),
            });
            let mut tracker = StageTracker::new();
            let err = engine
                .reconstruct_tracked(&StubSource, &mut tracker)
                .unwrap_err();

            assert_eq!(err.stage(), Some(stage));
            assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
            assert_eq!(
                tracker.state(),
                RunState::Failed {
                    stage,
                    kind: ErrorKind::DimensionMismatch
                }
            );
        }
    }

    #[test]
    fn test_acquisition_timeout_is_distinct() {
        let engine = ReconEngine::new(StubPipeline { fail_at: None });
        let err = engine.reconstruct(&TimedOutSource).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AcquisitionTimeout);
        assert_eq!(err.stage(), Some(Stage::AcquiringImage));
    }

    #[test]
    fn test_run_writes_to_sink() {
        let engine = ReconEngine::new(StubPipeline { fail_at: None });
        let sink = MemorySink::default();
        let summary = engine.run(&StubSource, &sink).unwrap();

        assert_eq!(summary.points, 2);
        assert_eq!(summary.output, PathBuf::from("memory"));
        assert_eq!(summary.peak_wavelength, Some(1000.0));
        assert_eq!(
            *sink.written.lock().unwrap(),
            vec![(PathBuf::from("stub.png"), 2)]
        );
    }

    #[test]
    fn test_failed_run_does_not_write() {
        let engine = ReconEngine::new(StubPipeline {
            fail_at: Some(Stage::Inferring),
        });
        let sink = MemorySink::default();
        assert!(engine.run(&StubSource, &sink).is_err());
        assert!(sink.written.lock().unwrap().is_empty());
    }
}
