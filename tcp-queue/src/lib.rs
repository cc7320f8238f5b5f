// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod auth;
pub mod frame;
pub mod protocol;
pub mod tcp_queue_client;
pub mod tcp_queue_server;
