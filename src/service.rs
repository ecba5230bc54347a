use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::brief::{BriefOverrides, CopyInput, MAX_SLIDES, resolve_brief};
use crate::copy::CopyGenerator;
use crate::dispatch::JobDispatcher;
use crate::error::CarouselError;
use crate::lifecycle::{CarouselStatus, LifecycleStateMachine, Operation, Transition};
use crate::llm::TextGenerator;
use crate::model::{
    Asset, AssetType, BrandColors, Carousel, CarouselWithSlides, Client, JobType, Project, Slide,
    slugify,
};
use crate::queue::JobQueue;
use crate::reconcile::SlideReconciler;
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_CLIENT_NAME: &str = "Geral";
pub const DEFAULT_CLIENT_SLUG: &str = "geral";
pub const DEFAULT_PROJECT_NAME: &str = "Carrosséis Rápidos";
const DEFAULT_PROJECT_DESCRIPTION: &str = "Carrosséis criados via gerador automático";
const BLANK_SLIDES_COUNT: u32 = 5;

/// A dangling reference in caller input is a lookup failure, not a store fault.
fn missing_as_not_found(err: StoreError) -> CarouselError {
    match err {
        StoreError::Missing { entity, id } => CarouselError::NotFound {
            entity,
            id: id.to_string(),
        },
        other => other.into(),
    }
}

/// Request for [`CarouselService::create_carousel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarousel {
    #[serde(flatten)]
    pub brief: CopyInput,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub style_preset: Option<String>,
}

/// Slide supplied by hand when creating a blank carousel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideDraft {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub subheadline: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
}

/// Acknowledgement of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccepted {
    pub job_id: String,
    pub carousel_id: Uuid,
}

/// Orchestration handlers. Each call is an independent request/response unit;
/// all durable state lives in the store.
pub struct CarouselService<S, Q, G> {
    store: S,
    dispatcher: JobDispatcher<Q>,
    copy: CopyGenerator<G>,
}

impl<S, Q, G> CarouselService<S, Q, G>
where
    S: RecordStore,
    Q: JobQueue,
    G: TextGenerator,
{
    pub fn new(store: S, dispatcher: JobDispatcher<Q>, copy: CopyGenerator<G>) -> Self {
        Self {
            store,
            dispatcher,
            copy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &JobDispatcher<Q> {
        &self.dispatcher
    }

    async fn load(&self, id: Uuid) -> Result<Carousel, CarouselError> {
        self.store
            .get_carousel(id)
            .await?
            .ok_or_else(|| CarouselError::carousel_not_found(id))
    }

    /// Persist `carousel` (already moved to `transition.to`) only if the row
    /// is still in `transition.from`.
    async fn commit(&self, carousel: &Carousel, transition: &Transition) -> Result<(), CarouselError> {
        if self.store.update_carousel_if(carousel, transition.from).await? {
            return Ok(());
        }
        Err(self.lost_race(carousel.id, transition).await)
    }

    /// `StateConflict` naming the status a concurrent writer left behind.
    async fn lost_race(&self, id: Uuid, transition: &Transition) -> CarouselError {
        let current = match self.load(id).await {
            Ok(carousel) => carousel.status,
            Err(e) => return e,
        };
        warn!(carousel_id = %id, expected = %transition.from, %current, "concurrent status change");
        CarouselError::StateConflict {
            operation: transition.operation,
            current,
            allowed: transition.operation.allowed_sources().to_vec(),
        }
    }

    /// Client `Geral` / project `Carrosséis Rápidos`, created on first use.
    pub async fn default_project(&self) -> Result<Project, CarouselError> {
        let mut client = Client::new(DEFAULT_CLIENT_NAME, DEFAULT_CLIENT_SLUG);
        client.brand_colors = BrandColors {
            primary: Some("#6c5ce7".into()),
            secondary: Some("#1a1a2e".into()),
            accent: Some("#e94560".into()),
        };
        let client = self.store.upsert_client(client).await?;
        let project = Project::new(
            client.id,
            DEFAULT_PROJECT_NAME,
            Some(DEFAULT_PROJECT_DESCRIPTION.to_string()),
        );
        Ok(self.store.upsert_project(project).await?)
    }

    /// Create a carousel from a brief with generated slides, status
    /// `draft_with_copy`. If the slides cannot be written the carousel row is
    /// deleted again.
    pub async fn create_carousel(&self, req: CreateCarousel) -> Result<CarouselWithSlides, CarouselError> {
        req.brief.validate()?;

        let project_id = match req.project_id {
            Some(id) => {
                self.store
                    .get_project(id)
                    .await?
                    .ok_or_else(|| CarouselError::NotFound {
                        entity: "project",
                        id: id.to_string(),
                    })?
                    .id
            }
            None => self.default_project().await?.id,
        };

        let brief = req.brief;
        let mut carousel = Carousel::new(project_id, brief.theme.clone(), CarouselStatus::DraftWithCopy);
        carousel.niche = Some(brief.niche.clone());
        carousel.theme = Some(brief.theme.clone());
        carousel.objective = Some(brief.objective.clone());
        carousel.tone = Some(brief.tone.clone());
        carousel.cta_final = Some(brief.cta.clone());
        carousel.slides_count = brief.slides_count;
        if let Some(preset) = req.style_preset.filter(|p| !p.trim().is_empty()) {
            carousel.style_preset = preset;
        }

        info!(carousel_id = %carousel.id, slides = brief.slides_count, "creating carousel");
        let copy = self.copy.generate(&brief).await;

        self.store.insert_carousel(&carousel).await?;
        let plan = SlideReconciler::plan(carousel.id, Vec::new(), &copy);
        if let Err(e) = self.store.insert_slides(&plan.inserts).await {
            error!(carousel_id = %carousel.id, error = %e, "slide insert failed, removing carousel");
            if let Err(cleanup) = self.store.delete_carousel(carousel.id).await {
                error!(carousel_id = %carousel.id, error = %cleanup, "failed to remove orphaned carousel");
            }
            return Err(e.into());
        }

        Ok(CarouselWithSlides {
            carousel,
            slides: plan.into_slides(),
        })
    }

    /// Create a `draft` carousel in `project_id` with the given slides, or
    /// five placeholder slides when none are given.
    pub async fn create_blank_carousel(
        &self,
        project_id: Uuid,
        title: &str,
        drafts: Vec<SlideDraft>,
    ) -> Result<CarouselWithSlides, CarouselError> {
        if title.trim().is_empty() {
            return Err(CarouselError::Validation("title is required".into()));
        }
        if drafts.len() > MAX_SLIDES as usize {
            return Err(CarouselError::Validation(format!(
                "at most {MAX_SLIDES} slides, got {}",
                drafts.len()
            )));
        }
        if self.store.get_project(project_id).await?.is_none() {
            return Err(CarouselError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }

        let drafts = if drafts.is_empty() {
            vec![SlideDraft::default(); BLANK_SLIDES_COUNT as usize]
        } else {
            drafts
        };

        let mut carousel = Carousel::new(project_id, title.trim(), CarouselStatus::Draft);
        carousel.slides_count = drafts.len() as u32;

        let slides: Vec<Slide> = drafts
            .into_iter()
            .zip(1u32..)
            .map(|(draft, position)| {
                let headline = draft
                    .headline
                    .filter(|h| !h.trim().is_empty())
                    .unwrap_or_else(|| format!("Slide {position}"));
                let mut slide = Slide::new(carousel.id, position, headline);
                slide.subheadline = draft.subheadline;
                slide.bullets = draft.bullets;
                slide.cta_text = draft.cta_text;
                slide
            })
            .collect();

        self.store.insert_carousel(&carousel).await?;
        if let Err(e) = self.store.insert_slides(&slides).await {
            error!(carousel_id = %carousel.id, error = %e, "slide insert failed, removing carousel");
            if let Err(cleanup) = self.store.delete_carousel(carousel.id).await {
                error!(carousel_id = %carousel.id, error = %cleanup, "failed to remove orphaned carousel");
            }
            return Err(e.into());
        }

        Ok(CarouselWithSlides { carousel, slides })
    }

    /// Generate (or regenerate) slide copy and move the carousel to
    /// `draft_with_copy`. Slides and status are written together; if another
    /// request moved the carousel meanwhile nothing is written.
    pub async fn request_copy(
        &self,
        id: Uuid,
        overrides: &BriefOverrides,
    ) -> Result<CarouselWithSlides, CarouselError> {
        let carousel = self.load(id).await?;
        let transition = LifecycleStateMachine::check(Operation::RequestCopy, carousel.status)?;

        let existing = self.store.list_slides(id).await?;
        let brief = resolve_brief(overrides, &carousel, existing.len());
        info!(carousel_id = %id, slides = brief.slides_count, "generating copy");

        let copy = self.copy.generate(&brief).await;
        let plan = SlideReconciler::plan(id, existing, &copy);

        let mut updated = carousel;
        updated.status = transition.to;
        updated.niche = Some(brief.niche);
        updated.theme = Some(brief.theme);
        updated.objective = Some(brief.objective);
        updated.tone = Some(brief.tone);
        updated.cta_final = Some(brief.cta);
        updated.slides_count = (plan.updates.len() + plan.inserts.len() + plan.untouched.len()) as u32;
        updated.updated_at = Utc::now();

        let applied = self
            .store
            .apply_copy(&updated, transition.from, &plan.updates, &plan.inserts)
            .await?;
        if !applied {
            return Err(self.lost_race(id, &transition).await);
        }

        info!(carousel_id = %id, "copy applied");
        Ok(CarouselWithSlides {
            carousel: updated,
            slides: plan.into_slides(),
        })
    }

    /// Approve the copy and hand the carousel to the render pipeline.
    pub async fn approve(&self, id: Uuid) -> Result<Carousel, CarouselError> {
        let carousel = self.load(id).await?;
        let transition = LifecycleStateMachine::check(Operation::Approve, carousel.status)?;

        let now = Utc::now();
        let mut updated = carousel;
        updated.status = transition.to;
        updated.approved_at = Some(now);
        updated.updated_at = now;
        self.commit(&updated, &transition).await?;

        self.dispatcher
            .dispatch_after(&self.store, id, &transition, JobType::GenerateLayout)
            .await?;

        info!(carousel_id = %id, "carousel approved");
        Ok(updated)
    }

    /// Start (or restart) rendering.
    pub async fn request_generate(&self, id: Uuid) -> Result<GenerateAccepted, CarouselError> {
        let carousel = self.load(id).await?;
        let transition = LifecycleStateMachine::check(Operation::RequestGenerate, carousel.status)?;

        let mut updated = carousel;
        updated.status = transition.to;
        updated.updated_at = Utc::now();
        self.commit(&updated, &transition).await?;

        let job = self
            .dispatcher
            .dispatch_after(&self.store, id, &transition, JobType::GenerateLayout)
            .await?;

        Ok(GenerateAccepted {
            job_id: job.queue_job_id().unwrap_or_default().to_string(),
            carousel_id: id,
        })
    }

    /// Worker callback: previews rendered.
    pub async fn mark_generated(&self, id: Uuid) -> Result<Carousel, CarouselError> {
        self.apply_worker_transition(id, Operation::MarkGenerated).await
    }

    /// Worker callback: hi-res exports ready.
    pub async fn mark_hires_ready(&self, id: Uuid) -> Result<Carousel, CarouselError> {
        self.apply_worker_transition(id, Operation::MarkHiresReady).await
    }

    async fn apply_worker_transition(&self, id: Uuid, operation: Operation) -> Result<Carousel, CarouselError> {
        let carousel = self.load(id).await?;
        let transition = LifecycleStateMachine::check(operation, carousel.status)?;

        let mut updated = carousel;
        updated.status = transition.to;
        updated.updated_at = Utc::now();
        self.commit(&updated, &transition).await?;

        info!(carousel_id = %id, status = %updated.status, "worker progress recorded");
        Ok(updated)
    }

    /// Move carousels stuck in `generating` (status written, job never
    /// enqueued) back to `target`. Returns the ids that were reset; a row that
    /// fails is logged and skipped.
    pub async fn reset_stuck(&self, target: CarouselStatus) -> Result<Vec<Uuid>, CarouselError> {
        if !matches!(target, CarouselStatus::Approved | CarouselStatus::DraftWithCopy) {
            return Err(CarouselError::Validation(format!(
                "stuck carousels can only be reset to \"approved\" or \"draft_with_copy\", not \"{target}\""
            )));
        }

        let stuck = self
            .store
            .list_carousels_by_status(CarouselStatus::Generating)
            .await?;
        if stuck.is_empty() {
            info!("no stuck carousels found");
            return Ok(Vec::new());
        }
        info!(count = stuck.len(), %target, "resetting stuck carousels");

        let mut reset = Vec::with_capacity(stuck.len());
        for mut carousel in stuck {
            let id = carousel.id;
            carousel.status = target;
            carousel.updated_at = Utc::now();
            match self
                .store
                .update_carousel_if(&carousel, CarouselStatus::Generating)
                .await
            {
                Ok(true) => {
                    info!(carousel_id = %id, title = %carousel.title, "reset");
                    reset.push(id);
                }
                Ok(false) => info!(carousel_id = %id, "no longer generating, skipped"),
                Err(e) => error!(carousel_id = %id, error = %e, "failed to reset"),
            }
        }
        Ok(reset)
    }

    pub async fn show(&self, id: Uuid) -> Result<CarouselWithSlides, CarouselError> {
        let carousel = self.load(id).await?;
        let slides = self.store.list_slides(id).await?;
        Ok(CarouselWithSlides { carousel, slides })
    }

    /// Carousels newest first, optionally limited to one project.
    pub async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<Carousel>, CarouselError> {
        Ok(self.store.list_carousels(project_id).await?)
    }

    pub async fn create_client(&self, name: &str, instagram_handle: Option<String>) -> Result<Client, CarouselError> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(CarouselError::Validation("name is required".into()));
        }
        let mut client = Client::new(name.trim(), slug);
        client.instagram_handle = instagram_handle;
        Ok(self.store.upsert_client(client).await?)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, CarouselError> {
        Ok(self.store.list_clients().await?)
    }

    pub async fn create_project(
        &self,
        client_id: Uuid,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, CarouselError> {
        if name.trim().is_empty() {
            return Err(CarouselError::Validation("name is required".into()));
        }
        let project = Project::new(client_id, name.trim(), description);
        self.store.upsert_project(project).await.map_err(missing_as_not_found)
    }

    pub async fn list_projects(&self, client_id: Uuid) -> Result<Vec<Project>, CarouselError> {
        Ok(self.store.list_projects(client_id).await?)
    }

    /// Record an already uploaded asset for a client.
    pub async fn register_asset(
        &self,
        client_id: Uuid,
        asset_type: AssetType,
        filename: &str,
        storage_url: &str,
        mime_type: Option<String>,
    ) -> Result<Asset, CarouselError> {
        if filename.trim().is_empty() || storage_url.trim().is_empty() {
            return Err(CarouselError::Validation("filename and storage_url are required".into()));
        }
        let asset = Asset {
            id: Uuid::new_v4(),
            client_id,
            asset_type,
            filename: filename.trim().to_string(),
            storage_url: storage_url.trim().to_string(),
            mime_type,
            created_at: Utc::now(),
        };
        self.store
            .insert_asset(&asset)
            .await
            .map_err(missing_as_not_found)?;
        Ok(asset)
    }

    pub async fn list_assets(&self, client_id: Uuid) -> Result<Vec<Asset>, CarouselError> {
        Ok(self.store.list_assets(client_id).await?)
    }
}
