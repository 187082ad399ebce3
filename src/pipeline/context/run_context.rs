use crate::common::{FilteredImage, RadarImage};
use crate::pipeline::context::metrics::RunMetrics;
use crate::pipeline::context::state::{Compared, Fetched, Filtered, Idle, ProcessingState};
use crate::pipeline::services::change_detector::CommitDecision;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use uuid::Uuid;

// RunContext with compile-time stage tracking: filtering needs a fetched image,
// comparing needs both artifacts.
pub struct RunContext<S> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    metrics: RunMetrics,
    processing_start: Instant,
    state: S,
}

impl<S: ProcessingState> RunContext<S> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut RunMetrics {
        &mut self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    fn advance<T>(self, next: impl FnOnce(S) -> T) -> RunContext<T> {
        RunContext {
            run_id: self.run_id,
            started_at: self.started_at,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: next(self.state),
        }
    }
}

impl RunContext<Idle> {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            metrics: RunMetrics::new(),
            processing_start: Instant::now(),
            state: Idle,
        }
    }

    pub fn into_fetched(self, radar: RadarImage) -> RunContext<Fetched> {
        self.advance(|Idle| Fetched { radar })
    }
}

impl Default for RunContext<Idle> {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext<Fetched> {
    pub fn radar(&self) -> &RadarImage {
        &self.state.radar
    }

    pub fn into_filtered(self, filtered: FilteredImage) -> RunContext<Filtered> {
        self.advance(|Fetched { radar }| Filtered { radar, filtered })
    }
}

impl RunContext<Filtered> {
    pub fn radar(&self) -> &RadarImage {
        &self.state.radar
    }

    pub fn filtered(&self) -> &FilteredImage {
        &self.state.filtered
    }

    pub fn into_compared(self, decision: CommitDecision) -> RunContext<Compared> {
        self.advance(|Filtered { radar, filtered }| Compared {
            radar,
            filtered,
            decision,
        })
    }
}

impl RunContext<Compared> {
    pub fn radar(&self) -> &RadarImage {
        &self.state.radar
    }

    pub fn filtered(&self) -> &FilteredImage {
        &self.state.filtered
    }

    pub fn decision(&self) -> &CommitDecision {
        &self.state.decision
    }
}
