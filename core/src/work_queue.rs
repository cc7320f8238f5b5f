// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::QueueError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Multi-producer multi-consumer FIFO shared by the coordinator and workers.
///
/// **Design Decision**: async so the same trait covers in-process queues and
/// queues reached over the network. Neither operation waits for an item:
/// callers poll `try_pop` and sleep on `None`.
#[async_trait]
pub trait WorkQueue<T: Send + 'static>: Clone + Send + Sync + 'static {
    /// Append an item. Unbounded, never waits for capacity.
    async fn push(&self, item: T) -> Result<(), QueueError>;

    /// Take the oldest item, or `None` if the queue is currently empty
    async fn try_pop(&self) -> Result<Option<T>, QueueError>;
}

/// Local queue using Arc<Mutex<VecDeque>>
pub struct InMemoryQueue<T> {
    items: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for InMemoryQueue<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for InMemoryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InMemoryQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl<T: Send + 'static> WorkQueue<T> for InMemoryQueue<T> {
    async fn push(&self, item: T) -> Result<(), QueueError> {
        self.items.lock().await.push_back(item);
        Ok(())
    }

    async fn try_pop(&self) -> Result<Option<T>, QueueError> {
        Ok(self.items.lock().await.pop_front())
    }
}
