use crate::auth;
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Request, Response};
use async_trait::async_trait;
use chunk_reduce_core::config::Config;
use chunk_reduce_core::error::QueueError;
use chunk_reduce_core::job::{JobMessage, ResultMessage};
use chunk_reduce_core::work_queue::WorkQueue;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::info;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated connection to a `TcpQueueServer`.
///
/// Cheap to clone; clones share the connection and take turns on it, one
/// request/response round trip at a time.
#[derive(Clone)]
pub struct TcpQueueClient {
    addr: Arc<String>,
    stream: Arc<Mutex<TcpStream>>,
}

impl TcpQueueClient {
    /// Connect and authenticate. No retries: an unreachable endpoint fails immediately.
    pub async fn connect(config: &Config) -> Result<Self, QueueError> {
        let addr = config.address();
        let connect_error = |source: io::Error| QueueError::Connect {
            addr: addr.clone(),
            source,
        };

        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| connect_error(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
            .map_err(connect_error)?;
        stream.set_nodelay(true).map_err(connect_error)?;

        let nonce = match read_frame::<_, Response>(&mut stream).await? {
            Some(Response::Challenge { nonce }) => {
                hex::decode(&nonce).map_err(|e| QueueError::Protocol(e.to_string()))?
            }
            Some(other) => {
                return Err(QueueError::Protocol(format!(
                    "expected a challenge, got {:?}",
                    other
                )))
            }
            None => return Err(QueueError::Closed),
        };

        let digest = auth::digest(&nonce, &config.secret);
        write_frame(&mut stream, &Request::Authenticate { digest }).await?;

        match read_frame::<_, Response>(&mut stream).await? {
            Some(Response::Welcome) => {}
            Some(Response::Denied) | None => {
                return Err(QueueError::AuthenticationFailed { addr: addr.clone() })
            }
            Some(other) => {
                return Err(QueueError::Protocol(format!(
                    "unexpected handshake response {:?}",
                    other
                )))
            }
        }

        info!("Client connected to {}", addr);
        Ok(Self {
            addr: Arc::new(addr),
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, request: Request) -> Result<Response, QueueError> {
        let mut stream = self.stream.lock().await;
        write_frame(&mut *stream, &request).await?;
        match read_frame::<_, Response>(&mut *stream).await? {
            Some(Response::Failed { message }) => Err(QueueError::Protocol(message)),
            Some(response) => Ok(response),
            None => Err(QueueError::Closed),
        }
    }

    pub async fn enqueue_job(&self, job: JobMessage) -> Result<(), QueueError> {
        match self.call(Request::EnqueueJob(job)).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn dequeue_job(&self) -> Result<Option<JobMessage>, QueueError> {
        match self.call(Request::DequeueJob).await? {
            Response::Job(job) => Ok(job),
            other => Err(unexpected(other)),
        }
    }

    pub async fn enqueue_result(&self, result: ResultMessage) -> Result<(), QueueError> {
        match self.call(Request::EnqueueResult(result)).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn dequeue_result(&self) -> Result<Option<ResultMessage>, QueueError> {
        match self.call(Request::DequeueResult).await? {
            Response::Result(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    pub fn job_queue(&self) -> RemoteJobQueue {
        RemoteJobQueue {
            client: self.clone(),
        }
    }

    pub fn result_queue(&self) -> RemoteResultQueue {
        RemoteResultQueue {
            client: self.clone(),
        }
    }
}

fn unexpected(response: Response) -> QueueError {
    QueueError::Protocol(format!("unexpected response {:?}", response))
}

/// Job queue proxy over a `TcpQueueClient`
#[derive(Clone)]
pub struct RemoteJobQueue {
    client: TcpQueueClient,
}

#[async_trait]
impl WorkQueue<JobMessage> for RemoteJobQueue {
    async fn push(&self, item: JobMessage) -> Result<(), QueueError> {
        self.client.enqueue_job(item).await
    }

    async fn try_pop(&self) -> Result<Option<JobMessage>, QueueError> {
        self.client.dequeue_job().await
    }
}

/// Result queue proxy over a `TcpQueueClient`
#[derive(Clone)]
pub struct RemoteResultQueue {
    client: TcpQueueClient,
}

#[async_trait]
impl WorkQueue<ResultMessage> for RemoteResultQueue {
    async fn push(&self, item: ResultMessage) -> Result<(), QueueError> {
        self.client.enqueue_result(item).await
    }

    async fn try_pop(&self) -> Result<Option<ResultMessage>, QueueError> {
        self.client.dequeue_result().await
    }
}
