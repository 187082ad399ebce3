use crate::error::AppError;
use async_trait::async_trait;

/// One stage of a run: consumes the context of the previous stage and
/// produces the next one.
#[async_trait]
pub trait ProcessingStep<In, Out>: Send
where
    In: Send + 'static,
    Out: Send + 'static,
{
    async fn process(&mut self, context: In) -> Result<Out, AppError>;
    fn name(&self) -> &'static str;
}
