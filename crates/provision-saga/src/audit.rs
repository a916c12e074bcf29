use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
    /// Rollback halted before reaching this step; its effects remain.
    CompensationSkipped,
}

/// Record of a step's execution in the saga.
#[derive(Debug)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the step started executing.
    pub started_at: Instant,
    /// When the step completed (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation (if applicable).
    pub compensation_description: Option<String>,
}

/// Audit log tracking all step executions in a saga.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
    compensation_sequence: Vec<String>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, name: &str) {
        self.records.push(StepRecord {
            name: name.to_string(),
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
    }

    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_success(&mut self, compensation_description: String) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
        }
    }

    pub(crate) fn record_compensated(&mut self, step_name: &str) {
        self.compensation_sequence.push(step_name.to_string());
        self.mark(step_name, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, step_name: &str) {
        self.compensation_sequence.push(step_name.to_string());
        self.mark(step_name, StepStatus::CompensationFailed);
    }

    pub(crate) fn record_compensation_skipped(&mut self, step_name: &str) {
        self.mark(step_name, StepStatus::CompensationSkipped);
    }

    fn mark(&mut self, step_name: &str, status: StepStatus) {
        for record in &mut self.records {
            if record.name == step_name {
                record.status = status;
                record.completed_at = Some(Instant::now());
            }
        }
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Steps whose compensation was attempted, in the order it ran.
    #[must_use]
    pub fn compensation_sequence(&self) -> Vec<&str> {
        self.compensation_sequence
            .iter()
            .map(String::as_str)
            .collect()
    }

    /// Steps left holding their effects after rollback, by name.
    #[must_use]
    pub fn unreleased(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    StepStatus::CompensationFailed | StepStatus::CompensationSkipped
                )
            })
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
                StepStatus::CompensationSkipped => "…",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}
