use crate::error::WorkerRuntimeError;
use async_trait::async_trait;
use std::thread;

/// Defines a unit of work that can be executed
#[async_trait]
pub trait WorkerTask: Send + 'static {
    type Output: Send + 'static;
    async fn run(self) -> Self::Output;
}

/// Trait for abstracting worker runtime (tasks, threads)
pub trait WorkerRuntime<T: WorkerTask>: Send + 'static {
    type Handle: Send;

    /// Spawn a worker task/thread
    fn spawn(task: T) -> Self::Handle;

    /// Wait for the worker to complete
    fn join(
        handle: Self::Handle,
    ) -> impl std::future::Future<Output = Result<T::Output, WorkerRuntimeError>> + Send;
}

/// Tokio task-based runtime
#[derive(Clone, Copy)]
pub struct TaskRuntime;

impl<T: WorkerTask> WorkerRuntime<T> for TaskRuntime {
    type Handle = tokio::task::JoinHandle<T::Output>;

    fn spawn(task: T) -> Self::Handle {
        tokio::spawn(task.run())
    }

    async fn join(handle: Self::Handle) -> Result<T::Output, WorkerRuntimeError> {
        handle
            .await
            .map_err(|e| WorkerRuntimeError::Join(e.to_string()))
    }
}

/// Thread-based runtime, one OS thread with its own current-thread runtime per worker
#[derive(Clone, Copy)]
pub struct ThreadRuntime;

impl<T: WorkerTask> WorkerRuntime<T> for ThreadRuntime {
    type Handle = thread::JoinHandle<Result<T::Output, WorkerRuntimeError>>;

    fn spawn(task: T) -> Self::Handle {
        thread::spawn(move || -> Result<T::Output, WorkerRuntimeError> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(rt.block_on(task.run()))
        })
    }

    async fn join(handle: Self::Handle) -> Result<T::Output, WorkerRuntimeError> {
        tokio::task::spawn_blocking(move || {
            handle
                .join()
                .map_err(|e| WorkerRuntimeError::Join(format!("Thread join error: {:?}", e)))
        })
        .await
        .map_err(|e| WorkerRuntimeError::Join(format!("Tokio join error: {}", e)))??
    }
}
