use crate::common::{Artifact, FilteredImage, RadarImage};
use crate::error::AppError;
use crate::pipeline::context::{Compared, Fetched, Filtered, Idle, RunContext};
use crate::pipeline::orchestration::processing_step::ProcessingStep;
use crate::pipeline::services::change_detector::ChangeDetector;
use crate::pipeline::services::fetch_service::ImageFetcher;
use crate::pipeline::services::palette_filter::ImageFilter;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Downloads the radar image and stores it at its fixed path.
pub struct FetchStep {
    fetcher: ImageFetcher,
    destination: PathBuf,
}

impl FetchStep {
    pub fn new(fetcher: ImageFetcher, destination: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            destination: destination.into(),
        }
    }

    pub async fn fetch(&mut self) -> Result<RadarImage, AppError> {
        let fetched = self.fetcher.fetch().await?;
        let artifact = Artifact::persist(&self.destination, fetched.body)?;
        info!(
            "Saved {} bytes from {} to {}",
            artifact.len(),
            fetched.url,
            artifact.path().display()
        );
        Ok(RadarImage(artifact))
    }
}

#[async_trait]
impl ProcessingStep<RunContext<Idle>, RunContext<Fetched>> for FetchStep {
    async fn process(&mut self, context: RunContext<Idle>) -> Result<RunContext<Fetched>, AppError> {
        let radar = self.fetch().await?;
        Ok(context.into_fetched(radar))
    }

    fn name(&self) -> &'static str {
        "FetchStep"
    }
}

/// Derives the filtered image from the radar image bytes handed to it.
pub struct FilterStep {
    filter: Box<dyn ImageFilter>,
    destination: PathBuf,
}

impl FilterStep {
    pub fn new(filter: Box<dyn ImageFilter>, destination: impl Into<PathBuf>) -> Self {
        Self {
            filter,
            destination: destination.into(),
        }
    }

    pub fn derive(&self, radar: &RadarImage) -> Result<FilteredImage, AppError> {
        let output = self.filter.apply(radar.0.bytes())?;
        let artifact = Artifact::persist(&self.destination, output)?;
        info!(
            "{} wrote {} bytes to {}",
            self.filter.name(),
            artifact.len(),
            artifact.path().display()
        );
        Ok(FilteredImage(artifact))
    }
}

#[async_trait]
impl ProcessingStep<RunContext<Fetched>, RunContext<Filtered>> for FilterStep {
    async fn process(
        &mut self,
        context: RunContext<Fetched>,
    ) -> Result<RunContext<Filtered>, AppError> {
        let filtered = self.derive(context.radar())?;
        Ok(context.into_filtered(filtered))
    }

    fn name(&self) -> &'static str {
        "FilterStep"
    }
}

/// Compares both artifacts with their last committed versions.
pub struct CompareStep {
    detector: ChangeDetector,
}

impl CompareStep {
    pub fn new(detector: ChangeDetector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl ProcessingStep<RunContext<Filtered>, RunContext<Compared>> for CompareStep {
    async fn process(
        &mut self,
        context: RunContext<Filtered>,
    ) -> Result<RunContext<Compared>, AppError> {
        let decision = self
            .detector
            .detect(&[&context.radar().0, &context.filtered().0])?;
        Ok(context.into_compared(decision))
    }

    fn name(&self) -> &'static str {
        "CompareStep"
    }
}
