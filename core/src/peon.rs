use crate::function_registry::FunctionRegistry;
use crate::job::{Job, JobMessage, JobOutcome, ResultMessage};
use crate::work_queue::WorkQueue;
use crate::worker_runtime::WorkerTask;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeonState {
    Running,
    Terminated,
}

/// Why a peon stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeonExit {
    /// Observed the sentinel and put it back for the next peon
    Sentinel,
    /// The queue became unreachable (e.g. the coordinator shut down)
    TransportLost { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeonReport {
    pub id: usize,
    pub jobs_processed: usize,
    pub error_markers: usize,
    pub empty_polls: usize,
    pub exit: PeonExit,
}

/// A single worker unit: pulls jobs until it sees the sentinel
pub struct Peon<J, R> {
    id: usize,
    jobs: J,
    results: R,
    registry: FunctionRegistry,
    poll_interval: Duration,
    state: PeonState,
}

impl<J, R> Peon<J, R>
where
    J: WorkQueue<JobMessage>,
    R: WorkQueue<ResultMessage>,
{
    pub fn new(
        id: usize,
        jobs: J,
        results: R,
        registry: FunctionRegistry,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            jobs,
            results,
            registry,
            poll_interval,
            state: PeonState::Running,
        }
    }

    pub fn state(&self) -> PeonState {
        self.state
    }

    async fn execute(&self, job: Job) -> JobOutcome {
        let registry = self.registry.clone();
        let function = job.function.clone();
        match tokio::task::spawn_blocking(move || registry.execute(&job)).await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::ErrorMarker {
                reason: format!("chunk function '{}' did not complete: {}", function, e),
            },
        }
    }

    fn terminate(&mut self, report: &mut PeonReport, exit: PeonExit) {
        report.exit = exit;
        self.state = PeonState::Terminated;
    }
}

#[async_trait]
impl<J, R> WorkerTask for Peon<J, R>
where
    J: WorkQueue<JobMessage>,
    R: WorkQueue<ResultMessage>,
{
    type Output = PeonReport;

    async fn run(mut self) -> Self::Output {
        let mut report = PeonReport {
            id: self.id,
            jobs_processed: 0,
            error_markers: 0,
            empty_polls: 0,
            exit: PeonExit::Sentinel,
        };

        while self.state == PeonState::Running {
            let message = match self.jobs.try_pop().await {
                Ok(message) => message,
                Err(e) => {
                    error!(peon = self.id, error = %e, "lost the job queue");
                    self.terminate(
                        &mut report,
                        PeonExit::TransportLost {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            match message {
                None => {
                    trace!(peon = self.id, "job queue empty, sleeping");
                    report.empty_polls += 1;
                    tokio::time::sleep(self.poll_interval).await;
                }
                Some(JobMessage::Sentinel) => {
                    // Put it back so the next peon waiting on the queue sees it too
                    let exit = match self.jobs.push(JobMessage::Sentinel).await {
                        Ok(()) => PeonExit::Sentinel,
                        Err(e) => {
                            error!(peon = self.id, error = %e, "could not re-publish the sentinel");
                            PeonExit::TransportLost {
                                reason: e.to_string(),
                            }
                        }
                    };
                    info!(
                        peon = self.id,
                        jobs = report.jobs_processed,
                        "received sentinel, terminating"
                    );
                    self.terminate(&mut report, exit);
                }
                Some(JobMessage::Job(job)) => {
                    debug!(
                        peon = self.id,
                        file = %job.argument.file.display(),
                        start = job.argument.start_record,
                        end = job.argument.end_record,
                        "processing chunk"
                    );
                    let outcome = self.execute(job.clone()).await;
                    if let JobOutcome::ErrorMarker { reason } = &outcome {
                        warn!(peon = self.id, function = %job.function, %reason, "job failed, reporting error marker");
                        report.error_markers += 1;
                    }
                    report.jobs_processed += 1;

                    if let Err(e) = self.results.push(ResultMessage { job, outcome }).await {
                        error!(peon = self.id, error = %e, "lost the result queue");
                        self.terminate(
                            &mut report,
                            PeonExit::TransportLost {
                                reason: e.to_string(),
                            },
                        );
                    }
                }
            }
        }

        report
    }
}
