// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod cli;
mod logging;

use chunk_reduce_core::chunk_planner::plan_all;
use chunk_reduce_core::coordinator::Coordinator;
use chunk_reduce_core::error::{
    ConfigError, CoordinatorError, PlanError, QueueError, WorkerRuntimeError,
};
use chunk_reduce_core::output::CsvSink;
use chunk_reduce_core::peon::PeonExit;
use chunk_reduce_core::worker_pool::WorkerPool;
use chunk_reduce_core::worker_runtime::TaskRuntime;
use chunk_reduce_phred::{count_records, PhredQualitySums};
use chunk_reduce_tcp::tcp_queue_client::TcpQueueClient;
use chunk_reduce_tcp::tcp_queue_server::TcpQueueServer;
use clap::Parser;
use cli::{Cli, CoordinatorArgs, Mode, WorkerArgs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("cannot read {file}: {source}")]
    Input {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Runtime(#[from] WorkerRuntimeError),
}

impl AppError {
    fn exit_code(&self) -> ExitCode {
        let code = match self {
            AppError::Config(_) | AppError::Plan(_) | AppError::Input { .. } => 2,
            AppError::Queue(e) | AppError::Coordinator(CoordinatorError::Queue(e)) => match e {
                QueueError::Bind { .. } => 3,
                QueueError::Connect { .. } | QueueError::AuthenticationFailed { .. } => 4,
                _ => 1,
            },
            AppError::Coordinator(CoordinatorError::IncompleteAggregation { .. }) => 5,
            AppError::Coordinator(_) | AppError::Runtime(_) => 1,
        };
        ExitCode::from(code)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);

    let result = match cli.mode {
        Mode::Coordinator(args) => run_coordinator(args).await,
        Mode::Worker(args) => run_worker(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    }
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<ExitCode, AppError> {
    let start_time = Instant::now();
    let config = args.config()?;

    let mut files = Vec::with_capacity(args.fastq_files.len());
    for file in &args.fastq_files {
        let records = count_records(file).map_err(|source| AppError::Input {
            file: file.clone(),
            source,
        })?;
        info!(file = %file.display(), records, "counted records");
        files.push((file.clone(), records));
    }

    let (jobs, file_sizes) = plan_all(&files, config.chunks)?;
    let coordinator = Coordinator::<TcpQueueServer>::start(config).await?;

    let mut sink = CsvSink::stdout();
    let report = coordinator
        .run(PhredQualitySums::NAME, jobs, &file_sizes, &mut sink)
        .await?;

    if report.error_markers > 0 {
        warn!("{} job(s) came back as error markers", report.error_markers);
    }
    info!(
        "Wrote {} file(s) in {:.2}s",
        report.written.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn run_worker(args: WorkerArgs) -> Result<ExitCode, AppError> {
    let config = args.config()?;
    let client = TcpQueueClient::connect(&config).await?;

    let pool = WorkerPool::<TaskRuntime>::new(chunk_reduce_phred::registry(), config.poll_interval());
    let reports = pool
        .run(client.job_queue(), client.result_queue(), config.workers)
        .await?;

    let lost = reports
        .iter()
        .filter(|r| matches!(r.exit, PeonExit::TransportLost { .. }))
        .count();
    if lost > 0 {
        warn!(
            "{} of {} workers lost the connection to {} before seeing the sentinel",
            lost,
            reports.len(),
            client.addr()
        );
    }

    Ok(ExitCode::SUCCESS)
}
