// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the job/result queue layer (local or networked)
#[derive(Error, Debug)]
pub enum QueueError {
    /// The coordinator could not bind its listening address
    #[error("failed to bind queue endpoint {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A client could not reach the queue endpoint (refused, unreachable or timed out)
    #[error("failed to connect to queue endpoint {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The endpoint rejected the shared secret
    #[error("queue endpoint {addr} rejected the shared secret")]
    AuthenticationFailed { addr: String },

    /// The peer sent something that does not follow the queue protocol
    #[error("queue protocol violation: {0}")]
    Protocol(String),

    /// Framing or encoding failure on an established connection
    #[error("queue transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The queue (or its connection) has been shut down
    #[error("queue is closed")]
    Closed,
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no shared secret configured (use --secret, CHUNK_REDUCE_SECRET or the config file)")]
    MissingSecret,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("chunk count must be at least 1")]
    ZeroChunks,
}

/// Per-file failures when turning accumulated sums into averages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("{file} has zero records, cannot compute an average")]
    DivisionByZeroRecords { file: PathBuf },

    #[error("{file}: {failed} chunk(s) came back as error markers")]
    ChunkFailures { file: PathBuf, failed: usize },

    #[error("{file} produced results but has no known record count")]
    UnknownFile { file: PathBuf },
}

/// Failures of a chunk function, contained by the worker and reported as data
#[derive(Error, Debug)]
pub enum ChunkFunctionError {
    #[error("I/O error on {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input in {file}: {message}")]
    Malformed { file: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum WorkerRuntimeError {
    #[error("worker join error: {0}")]
    Join(String),

    #[error("failed to build worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The result drain hit its deadline before every job reported back
    #[error("incomplete aggregation: collected {collected} of {expected} results before the drain timeout")]
    IncompleteAggregation { expected: usize, collected: usize },

    #[error("failed to write output for {label}: {source}")]
    Output {
        label: String,
        #[source]
        source: std::io::Error,
    },
}
