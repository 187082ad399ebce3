pub mod context;
pub mod orchestration;
pub mod services;

pub use context::{RunContext, RunPhase};
pub use orchestration::{RadarPipeline, RunOutcome, RunReport};
pub use services::{ChangeDetector, CommitDecision, ImageFetcher, ImageFilter, PaletteFilter};
