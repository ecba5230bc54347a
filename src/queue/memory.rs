use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{JobQueue, QueueError};

/// A submission accepted by [`MemoryJobQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
}

/// In-process queue that records submissions. Can be switched offline to
/// simulate an unreachable backend.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    next_id: AtomicU64,
    offline: AtomicBool,
    submitted: Mutex<Vec<Submitted>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        let queue = Self::default();
        queue.set_offline(true);
        queue
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }
}

impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job_name: &str, payload: &serde_json::Value) -> Result<String, QueueError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("connection refused".into()));
        }

        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let mut submitted = self
            .submitted
            .lock()
            .map_err(|_| QueueError::Unavailable("queue lock poisoned".into()))?;
        submitted.push(Submitted {
            id: id.clone(),
            name: job_name.to_string(),
            payload: payload.clone(),
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_sequential() {
        let queue = MemoryJobQueue::new();
        let a = queue.enqueue("orchestrate", &serde_json::json!({})).await.unwrap();
        let b = queue.enqueue("orchestrate", &serde_json::json!({})).await.unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("1", "2"));
        assert_eq!(queue.submitted().len(), 2);
    }

    #[tokio::test]
    async fn offline_queue_refuses() {
        let queue = MemoryJobQueue::offline();
        let err = queue.enqueue("orchestrate", &serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, QueueError::Unavailable(_)));
        assert!(queue.submitted().is_empty());
    }
}
