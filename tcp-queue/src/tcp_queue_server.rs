// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::auth;
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Request, Response};
use async_trait::async_trait;
use chunk_reduce_core::config::Config;
use chunk_reduce_core::error::QueueError;
use chunk_reduce_core::job::{JobMessage, ResultMessage};
use chunk_reduce_core::queue_service::QueueService;
use chunk_reduce_core::work_queue::{InMemoryQueue, WorkQueue};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Queues served to remote workers over authenticated TCP connections.
///
/// The coordinator uses the queues in-process; workers reach them through
/// `TcpQueueClient`.
pub struct TcpQueueServer {
    local_addr: SocketAddr,
    jobs: InMemoryQueue<JobMessage>,
    results: InMemoryQueue<ResultMessage>,
    shutdown: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl TcpQueueServer {
    /// The bound address (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[derive(Clone)]
struct SharedQueues {
    jobs: InMemoryQueue<JobMessage>,
    results: InMemoryQueue<ResultMessage>,
    secret: Arc<String>,
}

#[async_trait]
impl QueueService for TcpQueueServer {
    type Jobs = InMemoryQueue<JobMessage>;
    type Results = InMemoryQueue<ResultMessage>;

    async fn start(config: &Config) -> Result<Self, QueueError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| QueueError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| QueueError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let queues = SharedQueues {
            jobs: InMemoryQueue::new(),
            results: InMemoryQueue::new(),
            secret: Arc::new(config.secret.clone()),
        };
        let shutdown = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(listener, queues.clone(), shutdown.clone()));

        info!("Queue server listening on {}", local_addr);
        Ok(Self {
            local_addr,
            jobs: queues.jobs,
            results: queues.results,
            shutdown,
            accept_task,
        })
    }

    fn job_queue(&self) -> Self::Jobs {
        self.jobs.clone()
    }

    fn result_queue(&self) -> Self::Results {
        self.results.clone()
    }

    async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.accept_task.await {
            warn!(error = %e, "accept loop did not stop cleanly");
        }
    }
}

async fn accept_loop(listener: TcpListener, queues: SharedQueues, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%peer, error = %e, "could not disable Nagle on connection");
                    }
                    let queues = queues.clone();
                    let shutdown = shutdown.child_token();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            served = serve_connection(stream, &queues) => {
                                if let Err(e) = served {
                                    warn!(%peer, error = %e, "connection ended with an error");
                                }
                            }
                        }
                        debug!(%peer, "connection closed");
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
    }
}

async fn serve_connection(mut stream: TcpStream, queues: &SharedQueues) -> Result<(), QueueError> {
    let peer = stream.peer_addr()?;
    let nonce = auth::new_nonce();
    write_frame(
        &mut stream,
        &Response::Challenge {
            nonce: hex::encode(nonce),
        },
    )
    .await?;

    match read_frame::<_, Request>(&mut stream).await? {
        Some(Request::Authenticate { digest }) if auth::verify(&nonce, &queues.secret, &digest) => {
            write_frame(&mut stream, &Response::Welcome).await?;
            info!(%peer, "client authenticated");
        }
        Some(Request::Authenticate { .. }) => {
            warn!(%peer, "client presented a wrong secret");
            write_frame(&mut stream, &Response::Denied).await?;
            return Ok(());
        }
        Some(_) => {
            warn!(%peer, "request before authentication");
            write_frame(&mut stream, &Response::Denied).await?;
            return Ok(());
        }
        None => return Ok(()),
    }

    while let Some(request) = read_frame::<_, Request>(&mut stream).await? {
        let response = match request {
            Request::EnqueueJob(job) => queues.jobs.push(job).await.map(|_| Response::Ack),
            Request::DequeueJob => queues.jobs.try_pop().await.map(Response::Job),
            Request::EnqueueResult(result) => {
                queues.results.push(result).await.map(|_| Response::Ack)
            }
            Request::DequeueResult => queues.results.try_pop().await.map(Response::Result),
            Request::Authenticate { .. } => Ok(Response::Failed {
                message: "already authenticated".to_string(),
            }),
        };
        let response = response.unwrap_or_else(|e| Response::Failed {
            message: e.to_string(),
        });
        write_frame(&mut stream, &response).await?;
    }

    Ok(())
}
