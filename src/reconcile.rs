//! Merges generated copy into the persisted slide set.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::copy::{CopyOutput, SlideCopy};
use crate::model::Slide;

/// Writes needed to bring a carousel's slides in line with generated copy.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub updates: Vec<Slide>,
    pub inserts: Vec<Slide>,
    /// Existing slides no generated entry touched.
    pub untouched: Vec<Slide>,
}

impl ReconcilePlan {
    /// Every slide after the plan is applied, ordered by position.
    pub fn into_slides(self) -> Vec<Slide> {
        let mut slides: Vec<Slide> = self
            .updates
            .into_iter()
            .chain(self.inserts)
            .chain(self.untouched)
            .collect();
        slides.sort_by_key(|s| s.position);
        slides
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn apply_copy(slide: &mut Slide, copy: &SlideCopy) {
    slide.headline = copy.headline.clone();
    slide.subheadline = non_empty(&copy.subheadline);
    slide.bullets = copy.bullets.clone();
    slide.cta_text = non_empty(&copy.cta);
    slide.updated_at = Utc::now();
}

pub struct SlideReconciler;

impl SlideReconciler {
    /// Decide which slides to update in place and which to insert.
    ///
    /// Generated entries match existing slides by `position == idx`. Entries
    /// past the last existing position are inserted so the set grows instead
    /// of silently losing copy. Worker-owned fields are never touched.
    pub fn plan(carousel_id: Uuid, existing: Vec<Slide>, generated: &CopyOutput) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();
        let mut remaining = existing;

        for copy in &generated.slides {
            match remaining.iter().position(|s| s.position == copy.idx) {
                Some(i) => {
                    let mut slide = remaining.swap_remove(i);
                    apply_copy(&mut slide, copy);
                    plan.updates.push(slide);
                }
                None => {
                    let mut slide = Slide::new(carousel_id, copy.idx, copy.headline.clone());
                    apply_copy(&mut slide, copy);
                    plan.inserts.push(slide);
                }
            }
        }

        plan.untouched = remaining;
        debug!(
            %carousel_id,
            updated = plan.updates.len(),
            inserted = plan.inserts.len(),
            untouched = plan.untouched.len(),
            "slide plan"
        );
        plan
    }
}
