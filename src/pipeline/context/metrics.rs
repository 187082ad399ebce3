use indexmap::IndexMap;
use std::time::Duration;

/// Metrics collected while a run moves through its stages
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    stage_durations: IndexMap<&'static str, Duration>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stage_duration(&mut self, stage: &'static str, duration: Duration) {
        self.stage_durations.insert(stage, duration);
    }

    /// Stage durations in execution order, in milliseconds.
    pub fn stage_millis(&self) -> IndexMap<String, u64> {
        self.stage_durations
            .iter()
            .map(|(stage, duration)| (stage.to_string(), duration.as_millis() as u64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_stage_order() {
        let mut metrics = RunMetrics::new();
        metrics.record_stage_duration("fetch", Duration::from_millis(30));
        metrics.record_stage_duration("filter", Duration::from_millis(5));
        metrics.record_stage_duration("compare", Duration::from_millis(1));

        let stages: Vec<_> = metrics.stage_millis().into_keys().collect();
        assert_eq!(stages, vec!["fetch", "filter", "compare"]);
        assert_eq!(metrics.stage_millis()["filter"], 5);
    }
}
