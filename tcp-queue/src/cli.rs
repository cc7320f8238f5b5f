use chunk_reduce_core::aggregator::ErrorMarkerPolicy;
use chunk_reduce_core::config::Config;
use chunk_reduce_core::error::ConfigError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Average per-position PHRED quality of FASTQ files with networked workers",
    long_about = None
)]
pub struct Cli {
    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Plan the chunks, serve the queues and aggregate the results
    Coordinator(CoordinatorArgs),
    /// Connect to a coordinator and process chunks
    Worker(WorkerArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Fail,
    Skip,
}

impl From<PolicyArg> for ErrorMarkerPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Fail => ErrorMarkerPolicy::Fail,
            PolicyArg::Skip => ErrorMarkerPolicy::Skip,
        }
    }
}

/// Options shared by both modes
#[derive(Args)]
pub struct EndpointArgs {
    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Interface the coordinator listens on, or the coordinator host a worker connects to
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Pre-shared secret
    #[arg(long, env = "CHUNK_REDUCE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Sleep between polls of an empty queue
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

impl EndpointArgs {
    fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secret) = &self.secret {
            config.secret = secret.clone();
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }
        Ok(config)
    }
}

#[derive(Args)]
pub struct CoordinatorArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Number of chunks per input file
    #[arg(long)]
    pub chunks: Option<usize>,

    /// Output CSV file; with several inputs used as suffix `{file}.{output}`
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Give up waiting for results after this long (0 = never)
    #[arg(long)]
    pub drain_timeout_ms: Option<u64>,

    /// Time workers get to see the sentinel before the queues close
    #[arg(long)]
    pub grace_period_ms: Option<u64>,

    /// What to do with files that have chunks reported as error markers
    #[arg(long, value_enum)]
    pub error_marker_policy: Option<PolicyArg>,

    /// At least one FASTQ file to process
    #[arg(required = true)]
    pub fastq_files: Vec<PathBuf>,
}

impl CoordinatorArgs {
    pub fn config(&self) -> Result<Config, ConfigError> {
        let mut config = self.endpoint.load_config()?;
        if let Some(host) = &self.endpoint.host {
            config.bind_host = host.clone();
        }
        if let Some(chunks) = self.chunks {
            config.chunks = chunks;
        }
        if self.output.is_some() {
            config.output = self.output.clone();
        }
        if let Some(drain_timeout_ms) = self.drain_timeout_ms {
            config.drain_timeout_ms = drain_timeout_ms;
        }
        if let Some(grace_period_ms) = self.grace_period_ms {
            config.grace_period_ms = grace_period_ms;
        }
        if let Some(policy) = self.error_marker_policy {
            config.error_marker_policy = policy.into();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Number of peons to run on this host
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,
}

impl WorkerArgs {
    pub fn config(&self) -> Result<Config, ConfigError> {
        let mut config = self.endpoint.load_config()?;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}
