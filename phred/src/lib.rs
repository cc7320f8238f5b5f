// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_reduce_core::chunk_planner::ChunkDescriptor;
use chunk_reduce_core::error::ChunkFunctionError;
use chunk_reduce_core::function_registry::{ChunkFunction, FunctionRegistry};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Printable offset of Sanger/Illumina 1.8+ quality characters
pub const PHRED_OFFSET: u8 = 33;

/// Lines per FASTQ record: header, sequence, separator, quality
pub const RECORD_LINES: u64 = 4;

/// Number of complete records in a FASTQ file (line count divided by four)
pub fn count_records(path: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = 0u64;
    let mut buffer = Vec::new();
    while reader.read_until(b'\n', &mut buffer)? > 0 {
        lines += 1;
        buffer.clear();
    }
    Ok(lines / RECORD_LINES)
}

/// Per-position quality sums over records `[start_record, end_record)` of a chunk.
///
/// Reads of different lengths are allowed; a short read stops contributing at
/// its own length. Reaching the end of the file early ends the chunk.
pub fn read_quality_chunk(chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError> {
    let io_error = |source: io::Error| ChunkFunctionError::Io {
        file: chunk.file.clone(),
        source,
    };

    let mut sums: Vec<u64> = Vec::new();
    if chunk.is_empty() {
        return Ok(sums);
    }

    let mut reader = BufReader::new(File::open(&chunk.file).map_err(io_error)?);
    let mut line = Vec::new();

    for _ in 0..chunk.start_record * RECORD_LINES {
        line.clear();
        if reader.read_until(b'\n', &mut line).map_err(io_error)? == 0 {
            return Ok(sums);
        }
    }

    for record in chunk.start_record..chunk.end_record {
        for _ in 0..RECORD_LINES {
            line.clear();
            if reader.read_until(b'\n', &mut line).map_err(io_error)? == 0 {
                debug!(file = %chunk.file.display(), record, "reached end of file inside chunk");
                return Ok(sums);
            }
        }

        let quality = trim_line_end(&line);
        if quality.is_empty() {
            break;
        }
        if sums.len() < quality.len() {
            sums.resize(quality.len(), 0);
        }
        for (position, &symbol) in quality.iter().enumerate() {
            let score = symbol.checked_sub(PHRED_OFFSET).ok_or_else(|| {
                ChunkFunctionError::Malformed {
                    file: chunk.file.clone(),
                    message: format!(
                        "record {}: quality character {:?} is below the PHRED offset",
                        record, symbol as char
                    ),
                }
            })?;
            sums[position] += u64::from(score);
        }
    }

    Ok(sums)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && line[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &line[..end]
}

/// Chunk function summing decoded PHRED scores per read position
#[derive(Debug, Clone, Copy, Default)]
pub struct PhredQualitySums;

impl PhredQualitySums {
    pub const NAME: &'static str = "phred_sums";
}

impl ChunkFunction for PhredQualitySums {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError> {
        read_quality_chunk(chunk)
    }
}

/// Registry with every chunk function this crate provides
pub fn registry() -> FunctionRegistry {
    FunctionRegistry::new().register(PhredQualitySums)
}
