// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod aggregator;
pub mod chunk_planner;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod function_registry;
pub mod job;
pub mod output;
pub mod peon;
pub mod queue_service;
pub mod work_queue;
pub mod worker_pool;
pub mod worker_runtime;
