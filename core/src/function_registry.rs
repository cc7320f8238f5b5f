use crate::chunk_planner::ChunkDescriptor;
use crate::error::ChunkFunctionError;
use crate::job::{Job, JobOutcome};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A chunk-processing capability known to workers by name.
///
/// Jobs carry only the name; the code lives on the worker. Implementations
/// may block (they run on a blocking thread).
pub trait ChunkFunction: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Per-position sums over every record of the chunk
    fn process(&self, chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError>;
}

/// Chunk functions available on a worker, keyed by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ChunkFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F: ChunkFunction>(mut self, function: F) -> Self {
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Run a job to completion. Never fails: an unknown function, a function
    /// error or a panic all come back as an error marker.
    pub fn execute(&self, job: &Job) -> JobOutcome {
        let Some(function) = self.functions.get(&job.function) else {
            return JobOutcome::ErrorMarker {
                reason: format!("unknown chunk function '{}'", job.function),
            };
        };

        match catch_unwind(AssertUnwindSafe(|| function.process(&job.argument))) {
            Ok(Ok(sums)) => JobOutcome::Sums(sums),
            Ok(Err(e)) => JobOutcome::ErrorMarker {
                reason: e.to_string(),
            },
            Err(_) => JobOutcome::ErrorMarker {
                reason: format!("chunk function '{}' panicked", job.function),
            },
        }
    }
}
