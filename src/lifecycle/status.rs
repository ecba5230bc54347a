use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a carousel.
///
/// `draft` → `draft_with_copy` → `approved` → `generating` → `generated` →
/// `hires_ready` is the usual path, but the legal moves form a graph; see
/// [`LifecycleStateMachine`](super::LifecycleStateMachine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarouselStatus {
    Draft,
    DraftWithCopy,
    Approved,
    Generating,
    Generated,
    HiresReady,
}

impl CarouselStatus {
    pub const ALL: [CarouselStatus; 6] = [
        CarouselStatus::Draft,
        CarouselStatus::DraftWithCopy,
        CarouselStatus::Approved,
        CarouselStatus::Generating,
        CarouselStatus::Generated,
        CarouselStatus::HiresReady,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CarouselStatus::Draft => "draft",
            CarouselStatus::DraftWithCopy => "draft_with_copy",
            CarouselStatus::Approved => "approved",
            CarouselStatus::Generating => "generating",
            CarouselStatus::Generated => "generated",
            CarouselStatus::HiresReady => "hires_ready",
        }
    }
}

impl fmt::Display for CarouselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarouselStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CarouselStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown carousel status: {s}"))
    }
}
