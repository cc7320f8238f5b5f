use crate::error::WorkerRuntimeError;
use crate::function_registry::FunctionRegistry;
use crate::job::{JobMessage, ResultMessage};
use crate::peon::{Peon, PeonReport};
use crate::work_queue::WorkQueue;
use crate::worker_runtime::WorkerRuntime;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::info;

/// Runs a fixed number of peons against a job/result queue pair.
///
/// Shutdown is the cooperative sentinel protocol: each peon that pops the
/// sentinel pushes it back and exits, so peons leave one after another and
/// draining `k` peons takes up to `k` poll intervals.
pub struct WorkerPool<RT> {
    registry: FunctionRegistry,
    poll_interval: Duration,
    _phantom: PhantomData<RT>,
}

impl<RT> WorkerPool<RT> {
    pub fn new(registry: FunctionRegistry, poll_interval: Duration) -> Self {
        Self {
            registry,
            poll_interval,
            _phantom: PhantomData,
        }
    }

    /// Spawn `worker_count` peons and wait until every one has terminated
    pub async fn run<J, R>(
        &self,
        jobs: J,
        results: R,
        worker_count: usize,
    ) -> Result<Vec<PeonReport>, WorkerRuntimeError>
    where
        J: WorkQueue<JobMessage>,
        R: WorkQueue<ResultMessage>,
        RT: WorkerRuntime<Peon<J, R>>,
    {
        let handles: Vec<_> = (0..worker_count)
            .map(|id| {
                RT::spawn(Peon::new(
                    id,
                    jobs.clone(),
                    results.clone(),
                    self.registry.clone(),
                    self.poll_interval,
                ))
            })
            .collect();
        info!("Started {} workers", handles.len());

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            reports.push(RT::join(handle).await?);
        }

        info!(
            jobs = reports.iter().map(|r| r.jobs_processed).sum::<usize>(),
            "All workers terminated"
        );
        Ok(reports)
    }
}
