// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::Config;
use crate::error::QueueError;
use crate::job::{JobMessage, ResultMessage};
use crate::work_queue::{InMemoryQueue, WorkQueue};
use async_trait::async_trait;

/// Lifecycle of a job/result queue pair owned by the coordinator.
/// Different implementations for in-process and networked queues.
#[async_trait]
pub trait QueueService: Send + Sized + 'static {
    type Jobs: WorkQueue<JobMessage>;
    type Results: WorkQueue<ResultMessage>;

    /// Bring the queue pair up. Fails immediately if the endpoint cannot be bound.
    async fn start(config: &Config) -> Result<Self, QueueError>;

    fn job_queue(&self) -> Self::Jobs;

    fn result_queue(&self) -> Self::Results;

    /// Stop serving the queues. Items still queued are dropped.
    async fn shutdown(self);
}

/// In-process queue pair, for workers running inside the coordinator process
#[derive(Clone, Default)]
pub struct LocalQueueService {
    jobs: InMemoryQueue<JobMessage>,
    results: InMemoryQueue<ResultMessage>,
}

#[async_trait]
impl QueueService for LocalQueueService {
    type Jobs = InMemoryQueue<JobMessage>;
    type Results = InMemoryQueue<ResultMessage>;

    async fn start(_config: &Config) -> Result<Self, QueueError> {
        Ok(Self::default())
    }

    fn job_queue(&self) -> Self::Jobs {
        self.jobs.clone()
    }

    fn result_queue(&self) -> Self::Results {
        self.results.clone()
    }

    async fn shutdown(self) {}
}
