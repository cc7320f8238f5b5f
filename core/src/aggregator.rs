use crate::chunk_planner::ChunkDescriptor;
use crate::error::AggregationError;
use crate::job::{JobOutcome, PartialResult, ResultMessage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

/// What to do with a file that has chunks reported as error markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMarkerPolicy {
    /// Refuse to produce averages for the file
    #[default]
    Fail,
    /// Leave the failed chunks out of the sums and average anyway
    Skip,
}

/// Accumulated state of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAggregate {
    pub running_sums: Vec<u64>,
    pub failed_chunks: Vec<ChunkDescriptor>,
}

impl FileAggregate {
    fn add(&mut self, sums: &[u64]) {
        if sums.len() > self.running_sums.len() {
            self.running_sums.resize(sums.len(), 0);
        }
        for (total, value) in self.running_sums.iter_mut().zip(sums) {
            *total += value;
        }
    }
}

pub type Averages = BTreeMap<PathBuf, Result<Vec<f64>, AggregationError>>;

/// Streaming reduction of partial sums into per-file totals.
///
/// Folding is element-wise addition, so the result does not depend on the
/// order in which partial results arrive.
#[derive(Debug, Default)]
pub struct Aggregator {
    files: BTreeMap<PathBuf, FileAggregate>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold_partial(&mut self, partial: &PartialResult) {
        self.files
            .entry(partial.source_chunk.file.clone())
            .or_default()
            .add(&partial.per_position_sums);
    }

    /// Fold a worker result. Error markers are recorded against the file, never summed.
    pub fn fold(&mut self, result: &ResultMessage) {
        let entry = self
            .files
            .entry(result.job.argument.file.clone())
            .or_default();
        match &result.outcome {
            JobOutcome::Sums(sums) => entry.add(sums),
            JobOutcome::ErrorMarker { .. } => entry.failed_chunks.push(result.job.argument.clone()),
        }
    }

    pub fn file(&self, file: &Path) -> Option<&FileAggregate> {
        self.files.get(file)
    }

    pub fn error_markers(&self) -> usize {
        self.files.values().map(|f| f.failed_chunks.len()).sum()
    }

    /// Divide every file's sums by its total record count
    pub fn finalize(&self, file_sizes: &HashMap<PathBuf, u64>, policy: ErrorMarkerPolicy) -> Averages {
        let mut averages = BTreeMap::new();
        let empty = FileAggregate::default();

        for (file, total_records) in file_sizes {
            let aggregate = self.files.get(file).unwrap_or(&empty);
            averages.insert(file.clone(), finalize_file(file, aggregate, *total_records, policy));
        }

        for file in self.files.keys() {
            if !file_sizes.contains_key(file) {
                averages.insert(file.clone(), Err(AggregationError::UnknownFile { file: file.clone() }));
            }
        }

        averages
    }
}

fn finalize_file(
    file: &Path,
    aggregate: &FileAggregate,
    total_records: u64,
    policy: ErrorMarkerPolicy,
) -> Result<Vec<f64>, AggregationError> {
    if total_records == 0 {
        return Err(AggregationError::DivisionByZeroRecords {
            file: file.to_path_buf(),
        });
    }

    if !aggregate.failed_chunks.is_empty() {
        match policy {
            ErrorMarkerPolicy::Fail => {
                return Err(AggregationError::ChunkFailures {
                    file: file.to_path_buf(),
                    failed: aggregate.failed_chunks.len(),
                });
            }
            ErrorMarkerPolicy::Skip => warn!(
                file = %file.display(),
                failed = aggregate.failed_chunks.len(),
                "averaging without error-marked chunks"
            ),
        }
    }

    let divisor = total_records as f64;
    Ok(aggregate
        .running_sums
        .iter()
        .map(|sum| *sum as f64 / divisor)
        .collect())
}

/// Fold plain partial results and finalize them in one step
pub fn reduce(partials: &[PartialResult], file_sizes: &HashMap<PathBuf, u64>) -> Averages {
    let mut aggregator = Aggregator::new();
    for partial in partials {
        aggregator.fold_partial(partial);
    }
    aggregator.finalize(file_sizes, ErrorMarkerPolicy::Fail)
}
