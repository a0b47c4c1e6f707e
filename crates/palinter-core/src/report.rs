//! Thread-safe collection of violations.

use crate::types::Violation;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Accepts violations from concurrent subtree tasks.
///
/// Arrival order depends on scheduling; [`ViolationSink::into_sorted`]
/// restores a stable order.
#[derive(Debug, Default)]
pub struct ViolationSink {
    violations: Mutex<Vec<Violation>>,
}

impl ViolationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one violation.
    pub fn push(&self, violation: Violation) {
        tracing::trace!("{violation}");
        self.lock().push(violation);
    }

    /// Records several violations at once.
    pub fn extend(&self, violations: impl IntoIterator<Item = Violation>) {
        self.lock().extend(violations);
    }

    /// Number of violations recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consumes the sink, returning violations sorted by path.
    #[must_use]
    pub fn into_sorted(self) -> Vec<Violation> {
        let mut result = crate::types::LintResult {
            violations: self
                .violations
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            ..Default::default()
        };
        result.sort();
        result.violations
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Violation>> {
        self.violations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
