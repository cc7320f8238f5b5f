// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_reduce_core::chunk_planner::ChunkDescriptor;
use chunk_reduce_core::error::{ChunkFunctionError, QueueError};
use chunk_reduce_core::function_registry::{ChunkFunction, FunctionRegistry};
use chunk_reduce_core::job::{Job, JobMessage, JobOutcome, ResultMessage};
use chunk_reduce_core::peon::PeonExit;
use chunk_reduce_core::work_queue::{InMemoryQueue, WorkQueue};
use chunk_reduce_core::worker_pool::WorkerPool;
use chunk_reduce_core::worker_runtime::{TaskRuntime, ThreadRuntime};
use std::path::PathBuf;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(5);

/// Returns one sum per record in the chunk, equal to the record index
struct RecordIndex;

impl ChunkFunction for RecordIndex {
    fn name(&self) -> &str {
        "record_index"
    }

    fn process(&self, chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError> {
        Ok(vec![(chunk.start_record..chunk.end_record).sum()])
    }
}

struct Failing;

impl ChunkFunction for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn process(&self, chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError> {
        Err(ChunkFunctionError::Malformed {
            file: chunk.file.clone(),
            message: "bad record".to_string(),
        })
    }
}

struct Panicking;

impl ChunkFunction for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    fn process(&self, _chunk: &ChunkDescriptor) -> Result<Vec<u64>, ChunkFunctionError> {
        panic!("chunk function blew up")
    }
}

fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .register(RecordIndex)
        .register(Failing)
        .register(Panicking)
}

fn job(function: &str, start_record: u64, end_record: u64) -> Job {
    Job {
        function: function.to_string(),
        argument: ChunkDescriptor {
            file: PathBuf::from("reads.fq"),
            start_record,
            end_record,
        },
    }
}

async fn drain(results: &InMemoryQueue<ResultMessage>) -> Vec<ResultMessage> {
    let mut drained = Vec::new();
    while let Some(result) = results.try_pop().await.unwrap() {
        drained.push(result);
    }
    drained
}

#[test]
fn test_registry_reports_unknown_function_as_error_marker() {
    // Arrange
    let registry = registry();

    // Act
    let outcome = registry.execute(&job("missing", 0, 1));

    // Assert
    assert!(!registry.contains("missing"));
    assert!(matches!(outcome, JobOutcome::ErrorMarker { reason } if reason.contains("missing")));
}

#[test]
fn test_registry_contains_panics() {
    // Act
    let outcome = registry().execute(&job("panicking", 0, 1));

    // Assert
    assert!(matches!(outcome, JobOutcome::ErrorMarker { .. }));
}

#[test]
fn test_registry_runs_known_function() {
    // Act
    let outcome = registry().execute(&job("record_index", 2, 5));

    // Assert
    assert_eq!(outcome, JobOutcome::Sums(vec![2 + 3 + 4]));
}

#[tokio::test]
async fn test_sentinel_terminates_every_worker() {
    // Arrange
    let jobs = InMemoryQueue::new();
    let results = InMemoryQueue::new();
    for start in 0..10 {
        jobs.push(JobMessage::Job(job("record_index", start, start + 1)))
            .await
            .unwrap();
    }
    jobs.push(JobMessage::Sentinel).await.unwrap();
    let pool = WorkerPool::<TaskRuntime>::new(registry(), POLL);

    // Act
    let reports = pool.run(jobs.clone(), results.clone(), 4).await.unwrap();

    // Assert
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.exit == PeonExit::Sentinel));
    assert_eq!(reports.iter().map(|r| r.jobs_processed).sum::<usize>(), 10);
    assert_eq!(drain(&results).await.len(), 10);

    // Exactly one sentinel is left behind for late joiners
    assert_eq!(jobs.len().await, 1);
    assert_eq!(jobs.try_pop().await.unwrap(), Some(JobMessage::Sentinel));
}

#[tokio::test]
async fn test_workers_idle_until_sentinel_arrives() {
    // Arrange
    let jobs = InMemoryQueue::new();
    let results: InMemoryQueue<ResultMessage> = InMemoryQueue::new();
    let pool = WorkerPool::<TaskRuntime>::new(registry(), POLL);
    let publisher = jobs.clone();

    // Act
    let late = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        publisher.push(JobMessage::Sentinel).await.unwrap();
    });
    let reports = pool.run(jobs.clone(), results.clone(), 3).await.unwrap();
    late.await.unwrap();

    // Assert
    assert!(reports.iter().all(|r| r.exit == PeonExit::Sentinel));
    assert!(reports.iter().any(|r| r.empty_polls > 0));
    assert_eq!(reports.iter().map(|r| r.jobs_processed).sum::<usize>(), 0);
    assert_eq!(jobs.len().await, 1);
}

#[tokio::test]
async fn test_failing_jobs_do_not_stop_the_pool() {
    // Arrange
    let jobs = InMemoryQueue::new();
    let results = InMemoryQueue::new();
    jobs.push(JobMessage::Job(job("failing", 0, 1))).await.unwrap();
    jobs.push(JobMessage::Job(job("panicking", 1, 2))).await.unwrap();
    jobs.push(JobMessage::Job(job("unknown", 2, 3))).await.unwrap();
    jobs.push(JobMessage::Job(job("record_index", 3, 4))).await.unwrap();
    jobs.push(JobMessage::Sentinel).await.unwrap();
    let pool = WorkerPool::<TaskRuntime>::new(registry(), POLL);

    // Act
    let reports = pool.run(jobs, results.clone(), 2).await.unwrap();

    // Assert
    let results = drain(&results).await;
    assert_eq!(results.len(), 4);
    assert_eq!(results.iter().filter(|r| r.is_error_marker()).count(), 3);
    assert_eq!(reports.iter().map(|r| r.error_markers).sum::<usize>(), 3);

    let good = results.iter().find(|r| !r.is_error_marker()).unwrap();
    assert_eq!(good.job, job("record_index", 3, 4));
    assert_eq!(good.partial().unwrap().per_position_sums, vec![3]);
    assert!(reports.iter().all(|r| r.exit == PeonExit::Sentinel));
}

#[tokio::test]
async fn test_thread_runtime_runs_the_same_protocol() {
    // Arrange
    let jobs = InMemoryQueue::new();
    let results = InMemoryQueue::new();
    for start in 0..6 {
        jobs.push(JobMessage::Job(job("record_index", start, start + 2)))
            .await
            .unwrap();
    }
    jobs.push(JobMessage::Sentinel).await.unwrap();
    let pool = WorkerPool::<ThreadRuntime>::new(registry(), POLL);

    // Act
    let reports = pool.run(jobs.clone(), results.clone(), 3).await.unwrap();

    // Assert
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.exit == PeonExit::Sentinel));
    assert_eq!(drain(&results).await.len(), 6);
    assert_eq!(jobs.len().await, 1);
}

/// Job queue whose transport is gone
#[derive(Clone)]
struct Disconnected;

#[async_trait::async_trait]
impl WorkQueue<JobMessage> for Disconnected {
    async fn push(&self, _item: JobMessage) -> Result<(), QueueError> {
        Err(QueueError::Closed)
    }

    async fn try_pop(&self) -> Result<Option<JobMessage>, QueueError> {
        Err(QueueError::Closed)
    }
}

#[tokio::test]
async fn test_lost_transport_terminates_workers() {
    // Arrange
    let results: InMemoryQueue<ResultMessage> = InMemoryQueue::new();
    let pool = WorkerPool::<TaskRuntime>::new(registry(), POLL);

    // Act
    let reports = pool.run(Disconnected, results, 2).await.unwrap();

    // Assert
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| matches!(r.exit, PeonExit::TransportLost { .. })));
}
