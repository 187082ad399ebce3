pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod workflow;

pub use common::{Artifact, FilteredImage, RadarImage};
pub use config::Settings;
pub use error::{AppError, DecodeError, FetchError, ReadError, WriteError};
pub use pipeline::{RadarPipeline, RunOutcome, RunReport};
