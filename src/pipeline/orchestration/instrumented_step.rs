use crate::error::AppError;
use crate::pipeline::context::{ProcessingState, RunContext};
use crate::pipeline::orchestration::processing_step::ProcessingStep;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Wraps a step with timing, logging and per-stage duration recording.
pub struct InstrumentedStep<S, In, Out> {
    inner: S,
    step_name: &'static str,
    _stages: PhantomData<fn(In) -> Out>,
}

impl<S, In, Out> InstrumentedStep<S, In, Out> {
    pub fn new(step: S, step_name: &'static str) -> Self {
        Self {
            inner: step,
            step_name,
            _stages: PhantomData,
        }
    }
}

#[async_trait]
impl<S, In, Out> ProcessingStep<RunContext<In>, RunContext<Out>> for InstrumentedStep<S, In, Out>
where
    S: ProcessingStep<RunContext<In>, RunContext<Out>>,
    In: ProcessingState,
    Out: ProcessingState,
{
    #[instrument(skip(self, context), fields(step = %self.step_name, run_id = %context.run_id()))]
    async fn process(&mut self, context: RunContext<In>) -> Result<RunContext<Out>, AppError> {
        let start = Instant::now();
        debug!("Starting step '{}' from {}", self.step_name, context.state_name());

        let result = self.inner.process(context).await;
        let duration = start.elapsed();

        match result {
            Ok(mut next) => {
                next.metrics_mut()
                    .record_stage_duration(self.step_name, duration);
                debug!(
                    "Completed step '{}' in {}us, now {}",
                    self.step_name,
                    duration.as_micros(),
                    next.state_name()
                );
                Ok(next)
            }
            Err(e) => {
                error!(
                    "Step '{}' failed after {}us: {}",
                    self.step_name,
                    duration.as_micros(),
                    e
                );
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.step_name
    }
}

/// Extension trait to easily wrap steps with instrumentation
pub trait StepInstrumentation: Sized {
    fn instrumented<In, Out>(self, name: &'static str) -> InstrumentedStep<Self, In, Out>;
}

impl<S> StepInstrumentation for S
where
    S: Send,
{
    fn instrumented<In, Out>(self, name: &'static str) -> InstrumentedStep<Self, In, Out> {
        InstrumentedStep::new(self, name)
    }
}
