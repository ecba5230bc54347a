mod http;
#[cfg(test)]
mod memory;

use thiserror::Error;

pub use http::HttpJobQueue;
#[cfg(test)]
pub use memory::{MemoryJobQueue, Submitted};

/// Name of the single job this core submits; workers expand it into the
/// render pipeline.
pub const ORCHESTRATE_JOB: &str = "orchestrate";

#[derive(Debug, Error)]
pub enum QueueError {
    /// The backend could not be reached (connection refused, DNS, timeout).
    #[error("queue backend unreachable: {0}")]
    Unavailable(String),

    #[error("queue rejected the job (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected queue response: {0}")]
    InvalidResponse(String),
}

/// Submission side of the asynchronous job queue. Returns the queue's job id
/// once the submission is accepted; does not wait for the work itself.
#[allow(async_fn_in_trait)]
pub trait JobQueue {
    async fn enqueue(&self, job_name: &str, payload: &serde_json::Value) -> Result<String, QueueError>;
}

/// Queue chosen at startup. Without a configured backend every submission
/// fails, so `approve` and `generate` revert instead of losing the job.
pub enum QueueBackend {
    Http(HttpJobQueue),
    Unconfigured,
}

impl JobQueue for QueueBackend {
    async fn enqueue(&self, job_name: &str, payload: &serde_json::Value) -> Result<String, QueueError> {
        match self {
            QueueBackend::Http(queue) => queue.enqueue(job_name, payload).await,
            QueueBackend::Unconfigured => Err(QueueError::Unavailable(
                "no queue configured; set QUEUE_URL".into(),
            )),
        }
    }
}
