use crate::aggregator::Aggregator;
use crate::chunk_planner::ChunkDescriptor;
use crate::config::Config;
use crate::error::{AggregationError, CoordinatorError};
use crate::job::{Job, JobMessage};
use crate::output::{output_target, OutputSink, OutputTarget};
use crate::queue_service::QueueService;
use crate::work_queue::WorkQueue;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of a coordinator run
#[derive(Debug, Default)]
pub struct CoordinatorReport {
    /// Files whose averages were handed to the sink
    pub written: Vec<PathBuf>,
    /// Files that could not be averaged
    pub failures: Vec<AggregationError>,
    /// Results that came back as error markers
    pub error_markers: usize,
}

impl CoordinatorReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the queue pair: seeds jobs, drains results, stops the workers and
/// aggregates what came back
pub struct Coordinator<S: QueueService> {
    config: Config,
    service: S,
}

impl<S: QueueService> Coordinator<S> {
    /// Bring up the queue service. Fails fast if the endpoint is already bound.
    pub async fn start(config: Config) -> Result<Self, CoordinatorError> {
        let service = S::start(&config).await?;
        info!("Queue server started at {}", config.bind_address());
        Ok(Self { config, service })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn run<O>(
        self,
        function: &str,
        jobs: Vec<ChunkDescriptor>,
        file_sizes: &HashMap<PathBuf, u64>,
        sink: &mut O,
    ) -> Result<CoordinatorReport, CoordinatorError>
    where
        O: OutputSink + ?Sized,
    {
        if jobs.is_empty() {
            warn!("No jobs to distribute");
            self.service.shutdown().await;
            return Ok(CoordinatorReport::default());
        }

        let aggregator = match self.distribute_and_drain(function, jobs).await {
            Ok(aggregator) => aggregator,
            Err(e) => {
                self.service.shutdown().await;
                return Err(e);
            }
        };

        let grace_period = self.config.grace_period();
        info!("Sending the sentinel to the workers");
        let sentinel = self.service.job_queue().push(JobMessage::Sentinel).await;
        if let Err(e) = sentinel {
            warn!(error = %e, "could not publish the sentinel");
        } else {
            // Give workers a chance to see the sentinel and leave before the queues vanish
            tokio::time::sleep(grace_period).await;
        }
        self.service.shutdown().await;
        info!("Queue server shut down");

        let mut report = CoordinatorReport {
            error_markers: aggregator.error_markers(),
            ..Default::default()
        };
        let averages = aggregator.finalize(file_sizes, self.config.error_marker_policy);
        let file_count = averages.len();

        for (file, outcome) in averages {
            let values = match outcome {
                Ok(values) => values,
                Err(e) => {
                    error!(error = %e, "cannot average file");
                    report.failures.push(e);
                    continue;
                }
            };

            let label = file.display().to_string();
            let target = output_target(&file, file_count, self.config.output.as_deref());
            if target == OutputTarget::Default && file_count > 1 {
                sink.announce(&label)
                    .map_err(|source| CoordinatorError::Output {
                        label: label.clone(),
                        source,
                    })?;
            }
            sink.write(&target, &label, &values)
                .map_err(|source| CoordinatorError::Output {
                    label: label.clone(),
                    source,
                })?;
            report.written.push(file);
        }

        Ok(report)
    }

    async fn distribute_and_drain(
        &self,
        function: &str,
        jobs: Vec<ChunkDescriptor>,
    ) -> Result<Aggregator, CoordinatorError> {
        let job_queue = self.service.job_queue();
        let result_queue = self.service.result_queue();
        let expected = jobs.len();

        info!("Sending {} jobs", expected);
        for argument in jobs {
            job_queue
                .push(JobMessage::Job(Job {
                    function: function.to_string(),
                    argument,
                }))
                .await?;
        }

        let started = Instant::now();
        let deadline = self.config.drain_timeout();
        let mut aggregator = Aggregator::new();
        let mut collected = 0;

        while collected < expected {
            match result_queue.try_pop().await? {
                Some(result) => {
                    debug!(
                        file = %result.job.argument.file.display(),
                        start = result.job.argument.start_record,
                        end = result.job.argument.end_record,
                        error_marker = result.is_error_marker(),
                        "Got result {}/{}",
                        collected + 1,
                        expected
                    );
                    aggregator.fold(&result);
                    collected += 1;
                }
                None => {
                    if let Some(timeout) = deadline {
                        if started.elapsed() >= timeout {
                            return Err(CoordinatorError::IncompleteAggregation {
                                expected,
                                collected,
                            });
                        }
                    }
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
            }
        }

        info!("Got all {} results", expected);
        Ok(aggregator)
    }
}
