use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{JobQueue, QueueError};

const QUEUE_NAME: &str = "carousel";

#[derive(Debug, Serialize)]
struct EnqueueRequest<'a> {
    name: &'a str,
    data: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EnqueueResponse {
    id: serde_json::Value,
}

/// Submits jobs to a queue gateway over HTTP:
/// `POST {base_url}/queues/carousel/jobs` with `{"name", "data"}`, answered by
/// `{"id": ...}`.
pub struct HttpJobQueue {
    client: Client,
    base_url: String,
}

impl HttpJobQueue {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QueueError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn jobs_url(&self) -> String {
        format!("{}/queues/{QUEUE_NAME}/jobs", self.base_url)
    }
}

impl JobQueue for HttpJobQueue {
    async fn enqueue(&self, job_name: &str, payload: &serde_json::Value) -> Result<String, QueueError> {
        let response = self
            .client
            .post(self.jobs_url())
            .json(&EnqueueRequest {
                name: job_name,
                data: payload,
            })
            .send()
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueueError::Unavailable(format!("status {}: {message}", status.as_u16())));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(QueueError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<EnqueueResponse>()
            .await
            .map_err(|e| QueueError::InvalidResponse(e.to_string()))?;

        // Gateways return numeric or string ids.
        match body.id {
            serde_json::Value::String(id) if !id.is_empty() => Ok(id),
            serde_json::Value::Number(id) => Ok(id.to_string()),
            other => Err(QueueError::InvalidResponse(format!("invalid job id: {other}"))),
        }
    }
}
