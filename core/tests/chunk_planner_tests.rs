// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_reduce_core::chunk_planner::{plan, plan_all, ChunkDescriptor};
use chunk_reduce_core::error::PlanError;
use proptest::prelude::*;
use std::path::{Path, PathBuf};

fn assert_covers(chunks: &[ChunkDescriptor], total_records: u64) {
    let mut expected_start = 0;
    for chunk in chunks {
        assert_eq!(chunk.start_record, expected_start, "gap or overlap at {:?}", chunk);
        assert!(chunk.end_record >= chunk.start_record);
        expected_start = chunk.end_record;
    }
    assert_eq!(expected_start, total_records);
}

#[test]
fn test_even_split() {
    // Act
    let chunks = plan(Path::new("reads.fq"), 8, 4).unwrap();

    // Assert
    let ranges: Vec<_> = chunks.iter().map(|c| (c.start_record, c.end_record)).collect();
    assert_eq!(ranges, vec![(0, 2), (2, 4), (4, 6), (6, 8)]);
    assert!(chunks.iter().all(|c| c.file == Path::new("reads.fq")));
}

#[test]
fn test_uneven_split_uses_proportional_rounding() {
    // Act
    let chunks = plan(Path::new("reads.fq"), 10, 4).unwrap();

    // Assert
    // 2.5 rounds to 2 and 7.5 rounds to 8 (ties to even)
    let ranges: Vec<_> = chunks.iter().map(|c| (c.start_record, c.end_record)).collect();
    assert_eq!(ranges, vec![(0, 2), (2, 5), (5, 8), (8, 10)]);
}

#[test]
fn test_zero_records_yields_empty_chunks() {
    // Act
    let chunks = plan(Path::new("empty.fq"), 0, 4).unwrap();

    // Assert
    assert_eq!(chunks.len(), 4);
    assert!(chunks
        .iter()
        .all(|c| c.start_record == 0 && c.end_record == 0 && c.is_empty()));
}

#[test]
fn test_more_chunks_than_records() {
    // Act
    let chunks = plan(Path::new("tiny.fq"), 2, 5).unwrap();

    // Assert
    assert_eq!(chunks.len(), 5);
    assert_covers(&chunks, 2);
    assert_eq!(chunks.iter().filter(|c| !c.is_empty()).count(), 2);
}

#[test]
fn test_zero_chunks_is_rejected() {
    // Act
    let result = plan(Path::new("reads.fq"), 10, 0);

    // Assert
    assert_eq!(result, Err(PlanError::ZeroChunks));
}

#[test]
fn test_plan_all_keeps_input_order_and_sizes() {
    // Arrange
    let files = vec![(PathBuf::from("a.fq"), 4), (PathBuf::from("b.fq"), 6)];

    // Act
    let (jobs, sizes) = plan_all(&files, 2).unwrap();

    // Assert
    assert_eq!(jobs.len(), 4);
    assert_eq!(jobs[0].file, PathBuf::from("a.fq"));
    assert_eq!(jobs[1].file, PathBuf::from("a.fq"));
    assert_eq!(jobs[2].file, PathBuf::from("b.fq"));
    assert_eq!(jobs[3].end_record, 6);
    assert_eq!(sizes[&PathBuf::from("a.fq")], 4);
    assert_eq!(sizes[&PathBuf::from("b.fq")], 6);
}

#[test]
fn test_plan_all_plans_duplicate_file_once() {
    // Arrange
    let files = vec![
        (PathBuf::from("a.fq"), 4),
        (PathBuf::from("b.fq"), 2),
        (PathBuf::from("a.fq"), 4),
    ];

    // Act
    let (jobs, sizes) = plan_all(&files, 2).unwrap();

    // Assert
    assert_eq!(jobs.len(), 4);
    assert_eq!(
        jobs.iter().filter(|c| c.file == PathBuf::from("a.fq")).count(),
        2
    );
    assert_eq!(sizes.len(), 2);
}

proptest! {
    #[test]
    fn prop_chunks_cover_all_records(total_records in 0u64..5_000, chunk_count in 1usize..64) {
        let chunks = plan(Path::new("reads.fq"), total_records, chunk_count).unwrap();

        prop_assert_eq!(chunks.len(), chunk_count);
        assert_covers(&chunks, total_records);

        let sizes: Vec<u64> = chunks.iter().map(|c| c.len()).collect();
        let min = *sizes.iter().min().unwrap();
        let max = *sizes.iter().max().unwrap();
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn prop_every_chunk_count_up_to_record_count(total_records in 1u64..200) {
        for chunk_count in 1..=total_records as usize {
            let chunks = plan(Path::new("reads.fq"), total_records, chunk_count).unwrap();
            assert_covers(&chunks, total_records);
        }
    }

    #[test]
    fn prop_planning_is_idempotent(total_records in 0u64..100_000, chunk_count in 1usize..128) {
        let first = plan(Path::new("reads.fq"), total_records, chunk_count).unwrap();
        let second = plan(Path::new("reads.fq"), total_records, chunk_count).unwrap();
        prop_assert_eq!(first, second);
    }
}
