use std::sync::Arc;

use parking_lot::RwLock;

use crate::data::BenchmarkOutput;

/// Append-only, in-memory set of benchmark runs.
///
/// Runs are never mutated or removed once appended. Persisting them is up to
/// the caller.
#[derive(Debug, Default)]
pub struct RecordStore {
    outputs: RwLock<Vec<Arc<BenchmarkOutput>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outputs(outputs: impl IntoIterator<Item = BenchmarkOutput>) -> Self {
        RecordStore {
            outputs: RwLock::new(outputs.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn append(&self, output: BenchmarkOutput) {
        self.outputs.write().push(Arc::new(output));
    }

    /// All runs appended so far, in append order.
    pub fn snapshot(&self) -> Vec<Arc<BenchmarkOutput>> {
        self.outputs.read().clone()
    }

    /// Whether a run of `commit` on `date` has been appended already.
    pub fn contains(&self, date: &str, commit: &str) -> bool {
        self.outputs
            .read()
            .iter()
            .any(|output| output.date == date && output.commit == commit)
    }

    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.read().is_empty()
    }
}
