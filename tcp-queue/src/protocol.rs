use chunk_reduce_core::job::{JobMessage, ResultMessage};
use serde::{Deserialize, Serialize};

/// Client to server messages
#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    /// Answer to the server's challenge, sent once right after connecting
    Authenticate { digest: String },
    EnqueueJob(JobMessage),
    DequeueJob,
    EnqueueResult(ResultMessage),
    DequeueResult,
}

/// Server to client messages
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    /// First frame on every connection
    Challenge { nonce: String },
    Welcome,
    Denied,
    Ack,
    Job(Option<JobMessage>),
    Result(Option<ResultMessage>),
    Failed { message: String },
}
