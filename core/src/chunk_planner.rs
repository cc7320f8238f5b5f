use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A contiguous record range `[start_record, end_record)` of one input file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub file: PathBuf,
    pub start_record: u64,
    pub end_record: u64,
}

impl ChunkDescriptor {
    pub fn len(&self) -> u64 {
        self.end_record.saturating_sub(self.start_record)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `total_records` records of `file` into exactly `chunk_count` ranges.
///
/// Boundaries are `round(i * total / chunk_count)` with ties rounded to even,
/// so consecutive chunks differ in size by at most one record and together
/// cover `[0, total_records)` without gaps or overlaps. No I/O is performed.
pub fn plan(
    file: &Path,
    total_records: u64,
    chunk_count: usize,
) -> Result<Vec<ChunkDescriptor>, PlanError> {
    if chunk_count == 0 {
        return Err(PlanError::ZeroChunks);
    }

    let boundary = |i: usize| round_half_even(i as u128 * total_records as u128, chunk_count as u128);

    Ok((0..chunk_count)
        .map(|i| ChunkDescriptor {
            file: file.to_path_buf(),
            start_record: boundary(i),
            end_record: boundary(i + 1),
        })
        .collect())
}

/// Plan several files at once.
///
/// Returns the chunks of every file in input order together with the record
/// count table the aggregator divides by. A file listed more than once is
/// planned only the first time.
pub fn plan_all(
    files: &[(PathBuf, u64)],
    chunk_count: usize,
) -> Result<(Vec<ChunkDescriptor>, HashMap<PathBuf, u64>), PlanError> {
    let mut jobs = Vec::with_capacity(files.len() * chunk_count);
    let mut file_sizes = HashMap::with_capacity(files.len());

    for (file, total_records) in files {
        if file_sizes.contains_key(file) {
            warn!(file = %file.display(), "duplicate input file ignored");
            continue;
        }
        jobs.extend(plan(file, *total_records, chunk_count)?);
        file_sizes.insert(file.clone(), *total_records);
    }

    Ok((jobs, file_sizes))
}

fn round_half_even(numerator: u128, denominator: u128) -> u64 {
    let quotient = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);
    let rounded = if twice_remainder > denominator
        || (twice_remainder == denominator && quotient % 2 == 1)
    {
        quotient + 1
    } else {
        quotient
    };
    rounded as u64
}
