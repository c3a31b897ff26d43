use shared::protocol::{MetricsSnapshot, TrainingProgressSnapshot};

/// Latest metrics and training progress as reported by the service.
///
/// Both values are replaced wholesale; nothing is merged field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsAggregator {
    metrics: MetricsSnapshot,
    training: Option<TrainingProgressSnapshot>,
}

impl MetricsAggregator {
    pub fn update(&mut self, snapshot: MetricsSnapshot) {
        debug_assert!(
            snapshot.invalid_field().is_none(),
            "metrics must be validated before update"
        );
        self.metrics = snapshot;
    }

    pub fn current(&self) -> MetricsSnapshot {
        self.metrics
    }

    pub fn update_training(&mut self, progress: TrainingProgressSnapshot) {
        self.training = Some(progress);
    }

    pub fn training(&self) -> Option<TrainingProgressSnapshot> {
        self.training
    }
}
