//! Taxonomia de erros do núcleo de orquestração de carrosséis.
//!
//! [`CarouselError`] é o erro que os handlers devolvem ao chamador externo.
//! Cada variante corresponde a um [`ErrorKind`] para que o chamador possa
//! ramificar programaticamente sem inspecionar a mensagem.

use std::fmt;

use thiserror::Error;

use crate::lifecycle::{CarouselStatus, Operation};
use crate::queue::QueueError;
use crate::store::StoreError;

/// Errors surfaced by the orchestration handlers.
#[derive(Debug, Error)]
pub enum CarouselError {
    /// Malformed or missing input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not legal from the carousel's current status.
    #[error(
        "cannot {operation} carousel with status \"{current}\"; allowed: {}",
        join_statuses(.allowed)
    )]
    StateConflict {
        operation: Operation,
        current: CarouselStatus,
        allowed: Vec<CarouselStatus>,
    },

    /// Job submission failed after the status write. The write is compensated
    /// on a best-effort basis; see the logs for the outcome.
    #[error("job queue unavailable ({0}). Is the queue backend running?")]
    QueueUnavailable(#[source] QueueError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`CarouselError`] for programmatic branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    QueueUnavailable,
    Store,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::StateConflict => write!(f, "StateConflict"),
            ErrorKind::QueueUnavailable => write!(f, "QueueUnavailable"),
            ErrorKind::Store => write!(f, "StoreError"),
        }
    }
}

impl CarouselError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CarouselError::Validation(_) => ErrorKind::Validation,
            CarouselError::NotFound { .. } => ErrorKind::NotFound,
            CarouselError::StateConflict { .. } => ErrorKind::StateConflict,
            CarouselError::QueueUnavailable(_) => ErrorKind::QueueUnavailable,
            CarouselError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn carousel_not_found(id: impl fmt::Display) -> Self {
        CarouselError::NotFound {
            entity: "carousel",
            id: id.to_string(),
        }
    }
}

fn join_statuses(statuses: &[CarouselStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_conflict_names_current_and_allowed() {
        let err = CarouselError::StateConflict {
            operation: Operation::Approve,
            current: CarouselStatus::Generated,
            allowed: vec![CarouselStatus::Draft, CarouselStatus::DraftWithCopy],
        };
        assert_eq!(
            err.to_string(),
            "cannot approve carousel with status \"generated\"; allowed: \"draft\", \"draft_with_copy\""
        );
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn queue_unavailable_is_distinguishable() {
        let err = CarouselError::QueueUnavailable(QueueError::Unavailable("connection refused".into()));
        assert_eq!(err.kind(), ErrorKind::QueueUnavailable);
        assert!(err.to_string().contains("queue backend"));
    }

    #[test]
    fn not_found_display() {
        let err = CarouselError::carousel_not_found("abc");
        assert_eq!(err.to_string(), "carousel not found: abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CarouselError>();
    }
}
