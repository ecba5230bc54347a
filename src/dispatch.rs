//! Submissão do job de orquestração com reversão compensatória.
//!
//! O status já foi gravado quando o [`JobDispatcher`] é chamado. Se a fila
//! recusar a submissão, o status é revertido (compare-and-swap a partir do
//! destino da transição) e [`CarouselError::QueueUnavailable`] é devolvido
//! mesmo que a reversão falhe; nenhum registro de job é criado. O job só é
//! registrado depois que a fila aceitou a submissão.

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::CarouselError;
use crate::lifecycle::Transition;
use crate::model::{Job, JobType};
use crate::queue::{JobQueue, ORCHESTRATE_JOB, QueueError};
use crate::store::RecordStore;

pub struct JobDispatcher<Q> {
    queue: Q,
}

impl<Q: JobQueue> JobDispatcher<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Submit the orchestrate job for `carousel_id`.
    pub async fn dispatch(&self, carousel_id: Uuid) -> Result<String, QueueError> {
        self.queue
            .enqueue(ORCHESTRATE_JOB, &json!({ "carouselId": carousel_id }))
            .await
    }

    /// Submit the orchestrate job following an already persisted
    /// `transition`, and record it as a `job_type` tracking row.
    ///
    /// On submission failure the transition is compensated and
    /// `QueueUnavailable` is returned.
    pub async fn dispatch_after<S: RecordStore>(
        &self,
        store: &S,
        carousel_id: Uuid,
        transition: &Transition,
        job_type: JobType,
    ) -> Result<Job, CarouselError> {
        let queue_job_id = match self.dispatch(carousel_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(%carousel_id, error = %e, "failed to enqueue orchestrate job");
                if let Err(revert) = compensate(store, carousel_id, transition).await {
                    error!(%carousel_id, error = %revert, "status revert failed; carousel may need reset-stuck");
                }
                return Err(CarouselError::QueueUnavailable(e));
            }
        };

        let job = Job::queued(carousel_id, job_type, &queue_job_id);
        if let Err(e) = store.insert_job(&job).await {
            // The work is already queued; the status stays where it is.
            error!(%carousel_id, %queue_job_id, error = %e, "job enqueued but tracking row not written");
            return Err(e.into());
        }

        info!(%carousel_id, %queue_job_id, operation = ?transition.operation, "orchestrate job enqueued");
        Ok(job)
    }
}

/// Undo `transition` if the carousel is still in its destination status.
async fn compensate<S: RecordStore>(
    store: &S,
    carousel_id: Uuid,
    transition: &Transition,
) -> Result<(), CarouselError> {
    let (current, revert_to) = transition.compensation();
    let Some(mut carousel) = store.get_carousel(carousel_id).await? else {
        return Err(CarouselError::carousel_not_found(carousel_id));
    };
    carousel.status = revert_to;
    carousel.updated_at = Utc::now();

    if store.update_carousel_if(&carousel, current).await? {
        info!(%carousel_id, from = %current, to = %revert_to, "reverted carousel status");
    } else {
        warn!(%carousel_id, expected = %current, "carousel moved on before compensation; status left as is");
    }
    Ok(())
}
