use crate::chunk_planner::ChunkDescriptor;
use serde::{Deserialize, Serialize};

/// One unit of work: run the named chunk function on a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Name of a chunk function registered on the workers
    pub function: String,
    pub argument: ChunkDescriptor,
}

/// Items carried by the job queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobMessage {
    Job(Job),
    /// No more work. A peon that pops it must push it back before exiting.
    Sentinel,
}

/// What a worker produced for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// Per-position sums over every record of the chunk
    Sums(Vec<u64>),
    /// The job could not be executed; never folded into the sums
    ErrorMarker { reason: String },
}

/// Items carried by the result queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub job: Job,
    pub outcome: JobOutcome,
}

impl ResultMessage {
    pub fn is_error_marker(&self) -> bool {
        matches!(self.outcome, JobOutcome::ErrorMarker { .. })
    }

    /// The numeric partial result, if the job succeeded
    pub fn partial(&self) -> Option<PartialResult> {
        match &self.outcome {
            JobOutcome::Sums(sums) => Some(PartialResult {
                source_chunk: self.job.argument.clone(),
                per_position_sums: sums.clone(),
            }),
            JobOutcome::ErrorMarker { .. } => None,
        }
    }
}

/// A chunk's contribution to its file's sums, before division
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResult {
    pub source_chunk: ChunkDescriptor,
    pub per_position_sums: Vec<u64>,
}
