//! In-memory message queue.
//!
//! Named FIFO channels under one lock. This is the broker used for
//! local runs and tests; a networked broker implements the same
//! [`MessageQueue`] port.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;
use taskloom_core::error::EngineError;
use taskloom_core::port::MessageQueue;

#[derive(Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, VecDeque<Value>>>, EngineError> {
        self.queues
            .lock()
            .map_err(|_| EngineError::Runtime("queue lock poisoned".to_string()))
    }

    /// Messages waiting on one queue.
    pub fn depth(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .map(|queues| queues.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }
}

impl MessageQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, message: Value) -> Result<(), EngineError> {
        self.lock()?
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
        Ok(())
    }

    async fn take(&self, queue: &str) -> Result<Option<Value>, EngineError> {
        Ok(self.lock()?.get_mut(queue).and_then(VecDeque::pop_front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn queues_are_fifo_and_independent() {
        let queue = InMemoryQueue::new();
        queue.publish("a", json!(1)).await.unwrap();
        queue.publish("a", json!(2)).await.unwrap();
        queue.publish("b", json!(3)).await.unwrap();

        assert_eq!(queue.take("a").await.unwrap(), Some(json!(1)));
        assert_eq!(queue.take("a").await.unwrap(), Some(json!(2)));
        assert_eq!(queue.take("a").await.unwrap(), None);
        assert_eq!(queue.depth("b"), 1);
    }

    #[tokio::test]
    async fn take_from_unknown_queue_is_empty() {
        let queue = InMemoryQueue::new();
        assert_eq!(queue.take("nope").await.unwrap(), None);
    }
}
