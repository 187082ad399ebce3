use crate::config::Settings;
use crate::error::AppError;
use crate::pipeline::context::{Compared, Fetched, Filtered, Idle, RunContext, RunPhase};
use crate::pipeline::orchestration::instrumented_step::{InstrumentedStep, StepInstrumentation};
use crate::pipeline::orchestration::processing_step::ProcessingStep;
use crate::pipeline::orchestration::steps::{CompareStep, FetchStep, FilterStep};
use crate::pipeline::services::change_detector::{ChangeDetector, GitCommittedStore};
use crate::pipeline::services::fetch_service::ImageFetcher;
use crate::pipeline::services::palette_filter::PaletteFilter;
use crate::pipeline::services::publisher::{GitPublisher, Publisher};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing differs from the last commit.
    Unchanged,
    /// Something differs but no publisher was configured.
    Changed,
    Published { commit_id: String },
}

/// Summary of one run, printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub final_phase: RunPhase,
    pub outcome: RunOutcome,
    pub changed_paths: Vec<PathBuf>,
    pub stage_millis: IndexMap<String, u64>,
    pub elapsed_millis: u64,
}

impl RunReport {
    fn new(context: &RunContext<Compared>, final_phase: RunPhase, outcome: RunOutcome) -> Self {
        Self {
            run_id: context.run_id(),
            started_at: context.started_at(),
            final_phase,
            outcome,
            changed_paths: context.decision().changed_paths.clone(),
            stage_millis: context.metrics().stage_millis(),
            elapsed_millis: context.elapsed().as_millis() as u64,
        }
    }
}

/// Fetch, filter, compare and (optionally) publish, strictly in that order.
pub struct RadarPipeline {
    fetch: InstrumentedStep<FetchStep, Idle, Fetched>,
    filter: InstrumentedStep<FilterStep, Fetched, Filtered>,
    compare: InstrumentedStep<CompareStep, Filtered, Compared>,
    publisher: Option<Box<dyn Publisher>>,
    phase: RunPhase,
}

impl RadarPipeline {
    pub fn builder() -> RadarPipelineBuilder {
        RadarPipelineBuilder::new()
    }

    /// Wires the production components described by `settings`.
    pub fn from_settings(settings: &Settings, commit: bool) -> Result<Self, AppError> {
        let mut builder = Self::builder()
            .fetch_step(FetchStep::new(
                ImageFetcher::new(&settings.fetch)?,
                &settings.artifacts.radar_image,
            ))
            .filter_step(FilterStep::new(
                Box::new(PaletteFilter::new(&settings.filter)),
                &settings.artifacts.filtered_image,
            ))
            .compare_step(CompareStep::new(ChangeDetector::new(Box::new(
                GitCommittedStore::new(&settings.repository.path),
            ))));

        if commit {
            builder = builder.publisher(Box::new(GitPublisher::new(&settings.repository)));
        }
        builder.build()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<RunReport, AppError> {
        let result = self.run_stages().await;
        match &result {
            Ok(report) => info!("Run {} finished in {}ms", report.run_id, report.elapsed_millis),
            Err(e) => {
                transition(&mut self.phase, RunPhase::Failed);
                error!("Run aborted: {}", e);
            }
        }
        result
    }

    async fn run_stages(&mut self) -> Result<RunReport, AppError> {
        let context = RunContext::new();
        info!("Starting run {}", context.run_id());

        transition(&mut self.phase, RunPhase::Fetching);
        let context = self.fetch.process(context).await?;

        transition(&mut self.phase, RunPhase::Filtering);
        let context = self.filter.process(context).await?;

        transition(&mut self.phase, RunPhase::ComparingState);
        let mut context = self.compare.process(context).await?;

        if !context.decision().changed {
            info!("Artifacts match the last commit, nothing to publish");
            transition(&mut self.phase, RunPhase::Idle);
            return Ok(RunReport::new(&context, RunPhase::Idle, RunOutcome::Unchanged));
        }

        let Some(publisher) = self.publisher.as_mut() else {
            info!(
                "{} artifact(s) changed, publishing left to the caller",
                context.decision().changed_paths.len()
            );
            transition(&mut self.phase, RunPhase::Idle);
            return Ok(RunReport::new(&context, RunPhase::Idle, RunOutcome::Changed));
        };

        transition(&mut self.phase, RunPhase::Publishing);
        let publish_start = Instant::now();
        let receipt = publisher.publish(&context.decision().changed_paths).await?;
        context
            .metrics_mut()
            .record_stage_duration(publisher.name(), publish_start.elapsed());

        transition(&mut self.phase, RunPhase::Published);
        Ok(RunReport::new(
            &context,
            RunPhase::Published,
            RunOutcome::Published {
                commit_id: receipt.commit_id,
            },
        ))
    }
}

fn transition(phase: &mut RunPhase, next: RunPhase) {
    info!("{} -> {}", phase, next);
    *phase = next;
}

pub struct RadarPipelineBuilder {
    fetch: Option<FetchStep>,
    filter: Option<FilterStep>,
    compare: Option<CompareStep>,
    publisher: Option<Box<dyn Publisher>>,
}

impl RadarPipelineBuilder {
    pub fn new() -> Self {
        Self {
            fetch: None,
            filter: None,
            compare: None,
            publisher: None,
        }
    }

    pub fn fetch_step(mut self, step: FetchStep) -> Self {
        self.fetch = Some(step);
        self
    }

    pub fn filter_step(mut self, step: FilterStep) -> Self {
        self.filter = Some(step);
        self
    }

    pub fn compare_step(mut self, step: CompareStep) -> Self {
        self.compare = Some(step);
        self
    }

    // Without a publisher a changed run ends with `RunOutcome::Changed`.
    pub fn publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> Result<RadarPipeline, AppError> {
        let fetch = self
            .fetch
            .ok_or(AppError::Pipeline("Fetch step not set".to_string()))?;
        let filter = self
            .filter
            .ok_or(AppError::Pipeline("Filter step not set".to_string()))?;
        let compare = self
            .compare
            .ok_or(AppError::Pipeline("Compare step not set".to_string()))?;

        Ok(RadarPipeline {
            fetch: fetch.instrumented("fetch"),
            filter: filter.instrumented("filter"),
            compare: compare.instrumented("compare"),
            publisher: self.publisher,
            phase: RunPhase::Idle,
        })
    }
}

impl Default for RadarPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
