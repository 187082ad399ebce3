pub mod instrumented_step;
pub mod processing_step;
pub mod radar_pipeline;
pub mod steps;

pub use instrumented_step::{InstrumentedStep, StepInstrumentation};
pub use processing_step::ProcessingStep;
pub use radar_pipeline::{RadarPipeline, RadarPipelineBuilder, RunOutcome, RunReport};
pub use steps::{CompareStep, FetchStep, FilterStep};
