//! Progress reporting for overlay runs.
//!
//! [`run_overlay`](crate::run_overlay) announces each [`OverlayStage`] as it
//! starts and counts quantified pairs as they finish. Implementations are
//! called from rayon workers, so they must be `Send + Sync`.

/// Stages of an overlay run that report progress, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStage {
    /// Searching the subdivision index for candidate pairs.
    Indexing,
    /// Intersecting candidate pairs and deriving overlap weights.
    Quantifying,
    /// Joining attributes and reducing pairs into locality summaries.
    Aggregating,
}

impl OverlayStage {
    pub const ALL: [Self; 3] = [Self::Indexing, Self::Quantifying, Self::Aggregating];

    /// One-based position of the stage within a run.
    #[must_use]
    pub const fn step(self) -> usize {
        match self {
            Self::Indexing => 1,
            Self::Quantifying => 2,
            Self::Aggregating => 3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Indexing => "Finding overlapping subdivisions",
            Self::Quantifying => "Computing overlap areas",
            Self::Aggregating => "Aggregating locality summaries",
        }
    }
}

/// Receives progress updates from an overlay run.
pub trait ProgressCallback: Send + Sync {
    /// A stage is starting. `pairs` is the number of pairs it will work
    /// through, when known up front.
    fn start_stage(&self, stage: OverlayStage, pairs: Option<u64>);

    /// `pairs` more pairs of the current stage are done.
    fn advance(&self, pairs: u64);

    /// The run is complete.
    fn finish(&self, summary: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start_stage(&self, _stage: OverlayStage, _pairs: Option<u64>) {}
    fn advance(&self, _pairs: u64) {}
    fn finish(&self, _summary: String) {}
}
