use std::fmt;

use serde::{Deserialize, Serialize};

use super::status::CarouselStatus;
use crate::error::CarouselError;

/// Named operations that move a carousel between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Fill or refresh slide copy.
    RequestCopy,
    /// Lock the copy and hand the carousel to the render pipeline.
    Approve,
    /// (Re)start rendering.
    RequestGenerate,
    /// Worker callback: previews are rendered.
    MarkGenerated,
    /// Worker callback: hi-res exports are ready.
    MarkHiresReady,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RequestCopy => write!(f, "generate copy for"),
            Operation::Approve => write!(f, "approve"),
            Operation::RequestGenerate => write!(f, "generate"),
            Operation::MarkGenerated => write!(f, "mark as generated"),
            Operation::MarkHiresReady => write!(f, "mark as hires ready"),
        }
    }
}

impl Operation {
    /// Statuses from which this operation may be invoked.
    pub fn allowed_sources(self) -> &'static [CarouselStatus] {
        use CarouselStatus::*;
        match self {
            Operation::RequestCopy => &[Draft, DraftWithCopy],
            Operation::Approve => &[Draft, DraftWithCopy],
            // Generation may skip approval; see DESIGN.md.
            Operation::RequestGenerate => &[Approved, Generated, Draft, DraftWithCopy],
            Operation::MarkGenerated => &[Generating],
            Operation::MarkHiresReady => &[Generated],
        }
    }

    pub fn destination(self) -> CarouselStatus {
        match self {
            Operation::RequestCopy => CarouselStatus::DraftWithCopy,
            Operation::Approve => CarouselStatus::Approved,
            Operation::RequestGenerate => CarouselStatus::Generating,
            Operation::MarkGenerated => CarouselStatus::Generated,
            Operation::MarkHiresReady => CarouselStatus::HiresReady,
        }
    }

    /// Status restored when the queue submission following this operation
    /// fails. Only operations that enqueue have one.
    pub fn revert_target(self) -> Option<CarouselStatus> {
        match self {
            Operation::Approve => Some(CarouselStatus::DraftWithCopy),
            Operation::RequestGenerate => Some(CarouselStatus::Approved),
            _ => None,
        }
    }

    /// Whether a successful transition must be followed by a queue submission.
    pub fn enqueues_job(self) -> bool {
        matches!(self, Operation::Approve | Operation::RequestGenerate)
    }
}

/// A checked, not yet persisted, status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub operation: Operation,
    pub from: CarouselStatus,
    pub to: CarouselStatus,
}

impl Transition {
    /// The compensating move `(expected, revert_to)` applied when the queue
    /// submission after this transition fails.
    pub fn compensation(&self) -> (CarouselStatus, CarouselStatus) {
        (self.to, self.operation.revert_target().unwrap_or(self.from))
    }
}

/// Authoritative table of legal carousel status transitions.
pub struct LifecycleStateMachine;

impl LifecycleStateMachine {
    /// Validate `operation` against `current` and return the transition to
    /// apply. Fails with [`CarouselError::StateConflict`] without side effects.
    pub fn check(operation: Operation, current: CarouselStatus) -> Result<Transition, CarouselError> {
        let allowed = operation.allowed_sources();
        if !allowed.contains(&current) {
            return Err(CarouselError::StateConflict {
                operation,
                current,
                allowed: allowed.to_vec(),
            });
        }

        Ok(Transition {
            operation,
            from: current,
            to: operation.destination(),
        })
    }

    pub fn is_legal(operation: Operation, current: CarouselStatus) -> bool {
        operation.allowed_sources().contains(&current)
    }
}
