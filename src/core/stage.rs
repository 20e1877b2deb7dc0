use crate::utils::error::ErrorKind;
use std::fmt;

/// Steps of a single reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    AcquiringImage,
    LoadingAssets,
    ExtractingFeatures,
    Normalizing,
    Inferring,
    BuildingResult,
    Done,
}

impl Stage {
    /// The step that follows `self` on the success path.
    pub fn next(self) -> Stage {
        match self {
            Stage::Idle => Stage::AcquiringImage,
            Stage::AcquiringImage => Stage::LoadingAssets,
            Stage::LoadingAssets => Stage::ExtractingFeatures,
            Stage::ExtractingFeatures => Stage::Normalizing,
            Stage::Normalizing => Stage::Inferring,
            Stage::Inferring => Stage::BuildingResult,
            Stage::BuildingResult | Stage::Done => Stage::Done,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::AcquiringImage => "acquiring the image",
            Stage::LoadingAssets => "loading assets",
            Stage::ExtractingFeatures => "extracting ROI features",
            Stage::Normalizing => "normalizing features",
            Stage::Inferring => "running inference",
            Stage::BuildingResult => "building the spectrum",
            Stage::Done => "finishing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::AcquiringImage => "AcquiringImage",
            Stage::LoadingAssets => "LoadingAssets",
            Stage::ExtractingFeatures => "ExtractingFeatures",
            Stage::Normalizing => "Normalizing",
            Stage::Inferring => "Inferring",
            Stage::BuildingResult => "BuildingResult",
            Stage::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Observable state of a run: a stage on the success path, or the absorbing failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    At(Stage),
    Failed { stage: Stage, kind: ErrorKind },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::At(Stage::Done) | RunState::Failed { .. })
    }
}

/// Per-run state tracker. Created fresh for every reconstruction call.
#[derive(Debug)]
pub struct StageTracker {
    state: RunState,
    history: Vec<RunState>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            state: RunState::At(Stage::Idle),
            history: vec![RunState::At(Stage::Idle)],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn current_stage(&self) -> Stage {
        match self.state {
            RunState::At(stage) | RunState::Failed { stage, .. } => stage,
        }
    }

    /// Advance along the success path. A failed tracker does not move.
    pub fn advance(&mut self) -> Stage {
        if let RunState::At(stage) = self.state {
            let next = stage.next();
            tracing::debug!("stage {} -> {}", stage, next);
            self.set(RunState::At(next));
        }
        self.current_stage()
    }

    pub fn fail(&mut self, kind: ErrorKind) {
        let stage = self.current_stage();
        tracing::debug!("stage {} -> Failed({:?})", stage, kind);
        self.set(RunState::Failed { stage, kind });
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn set(&mut self, state: RunState) {
        self.state = state;
        self.history.push(state);
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
