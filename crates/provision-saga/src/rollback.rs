/// Order in which completed steps are compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackOrder {
    /// Last completed step first (LIFO).
    #[default]
    Reverse,
    /// First completed step first, i.e. registration order.
    Forward,
}

/// What the rollback pass does when a compensation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompensationFailureMode {
    /// Keep compensating the remaining steps and report every failure.
    #[default]
    Continue,
    /// Stop at the first failure; the remaining steps are reported as skipped.
    Halt,
}

/// Rollback behaviour of a saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollbackPolicy {
    pub order: RollbackOrder,
    pub on_failure: CompensationFailureMode,
}

impl RollbackPolicy {
    /// Order the completed steps for compensation.
    pub(crate) fn arrange<T>(&self, mut completed: Vec<T>) -> Vec<T> {
        if self.order == RollbackOrder::Reverse {
            completed.reverse();
        }
        completed
    }
}
