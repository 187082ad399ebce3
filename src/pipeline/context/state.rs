use crate::common::{FilteredImage, RadarImage};
use crate::pipeline::services::change_detector::CommitDecision;

// Markers to track how far a run has progressed
pub struct Idle;
pub struct Fetched {
    pub(super) radar: RadarImage,
}
pub struct Filtered {
    pub(super) radar: RadarImage,
    pub(super) filtered: FilteredImage,
}
pub struct Compared {
    pub(super) radar: RadarImage,
    pub(super) filtered: FilteredImage,
    pub(super) decision: CommitDecision,
}

pub trait ProcessingState: Send + 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for Idle {
    fn state_name() -> &'static str {
        "Idle"
    }
}

impl ProcessingState for Fetched {
    fn state_name() -> &'static str {
        "Fetched"
    }
}

impl ProcessingState for Filtered {
    fn state_name() -> &'static str {
        "Filtered"
    }
}

impl ProcessingState for Compared {
    fn state_name() -> &'static str {
        "Compared"
    }
}

/// Observable phase of a run, used for logging and the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum RunPhase {
    Idle,
    Fetching,
    Filtering,
    ComparingState,
    Publishing,
    Published,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "Idle",
            RunPhase::Fetching => "Fetching",
            RunPhase::Filtering => "Filtering",
            RunPhase::ComparingState => "ComparingState",
            RunPhase::Publishing => "Publishing",
            RunPhase::Published => "Published",
            RunPhase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
