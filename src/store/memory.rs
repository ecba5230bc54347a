use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::lifecycle::CarouselStatus;
use crate::model::{Asset, Carousel, Client, Job, Project, Slide};

#[derive(Debug, Default, Clone)]
struct Tables {
    clients: Vec<Client>,
    projects: Vec<Project>,
    assets: Vec<Asset>,
    carousels: Vec<Carousel>,
    slides: Vec<Slide>,
    jobs: Vec<Job>,
}

/// In-process record store with the same constraints as [`super::SqliteStore`]
/// and hooks to inject failures and races.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_slide_inserts: AtomicBool,
    fail_job_inserts: AtomicBool,
    race_to: Mutex<Option<CarouselStatus>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent slide inserts fail, to exercise cleanup paths.
    pub fn fail_slide_inserts(&self, fail: bool) {
        self.fail_slide_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent job inserts fail.
    pub fn fail_job_inserts(&self, fail: bool) {
        self.fail_job_inserts.store(fail, Ordering::SeqCst);
    }

    /// Right after the next `get_carousel` returns, move that carousel to
    /// `status`, as a concurrent request would.
    pub fn race_next_read(&self, status: CarouselStatus) {
        if let Ok(mut race) = self.race_to.lock() {
            *race = Some(status);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self.lock()?;
        Ok(f(&tables))
    }

    /// Run `f` against a copy of the tables and keep the copy only on success.
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        *tables = staged;
        Ok(out)
    }
}

fn check_new_slides(t: &Tables, slides: &[Slide]) -> Result<(), StoreError> {
    for (i, slide) in slides.iter().enumerate() {
        if !t.carousels.iter().any(|c| c.id == slide.carousel_id) {
            return Err(StoreError::Missing {
                entity: "carousel",
                id: slide.carousel_id,
            });
        }
        let taken = t
            .slides
            .iter()
            .chain(&slides[..i])
            .any(|s| s.carousel_id == slide.carousel_id && s.position == slide.position);
        if taken {
            return Err(StoreError::Constraint(format!(
                "slide position {} already used in carousel {}",
                slide.position, slide.carousel_id
            )));
        }
    }
    Ok(())
}

fn replace_carousel_if(
    t: &mut Tables,
    carousel: &Carousel,
    expected: CarouselStatus,
) -> Result<bool, StoreError> {
    let row = t
        .carousels
        .iter_mut()
        .find(|c| c.id == carousel.id)
        .ok_or(StoreError::Missing {
            entity: "carousel",
            id: carousel.id,
        })?;
    if row.status != expected {
        return Ok(false);
    }
    *row = carousel.clone();
    Ok(true)
}

impl RecordStore for MemoryStore {
    async fn upsert_client(&self, client: Client) -> Result<Client, StoreError> {
        self.write(|t| {
            if let Some(existing) = t.clients.iter().find(|c| c.slug == client.slug) {
                return Ok(existing.clone());
            }
            t.clients.push(client.clone());
            Ok(client)
        })
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        self.read(|t| t.clients.clone())
    }

    async fn upsert_project(&self, project: Project) -> Result<Project, StoreError> {
        self.write(|t| {
            if !t.clients.iter().any(|c| c.id == project.client_id) {
                return Err(StoreError::Missing {
                    entity: "client",
                    id: project.client_id,
                });
            }
            if let Some(existing) = t
                .projects
                .iter()
                .find(|p| p.client_id == project.client_id && p.name == project.name)
            {
                return Ok(existing.clone());
            }
            t.projects.push(project.clone());
            Ok(project)
        })
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        self.read(|t| t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError> {
        self.read(|t| {
            let mut projects: Vec<Project> = t
                .projects
                .iter()
                .filter(|p| p.client_id == client_id)
                .cloned()
                .collect();
            projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            projects
        })
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.clients.iter().any(|c| c.id == asset.client_id) {
                return Err(StoreError::Missing {
                    entity: "client",
                    id: asset.client_id,
                });
            }
            t.assets.push(asset.clone());
            Ok(())
        })
    }

    async fn list_assets(&self, client_id: Uuid) -> Result<Vec<Asset>, StoreError> {
        self.read(|t| {
            t.assets
                .iter()
                .filter(|a| a.client_id == client_id)
                .cloned()
                .collect()
        })
    }

    async fn insert_carousel(&self, carousel: &Carousel) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.projects.iter().any(|p| p.id == carousel.project_id) {
                return Err(StoreError::Missing {
                    entity: "project",
                    id: carousel.project_id,
                });
            }
            if t.carousels.iter().any(|c| c.id == carousel.id) {
                return Err(StoreError::Constraint(format!(
                    "carousel {} already exists",
                    carousel.id
                )));
            }
            t.carousels.push(carousel.clone());
            Ok(())
        })
    }

    async fn get_carousel(&self, id: Uuid) -> Result<Option<Carousel>, StoreError> {
        let found = self.read(|t| t.carousels.iter().find(|c| c.id == id).cloned())?;
        let race = self.race_to.lock().ok().and_then(|mut r| r.take());
        if let Some(status) = race {
            self.write(|t| {
                if let Some(row) = t.carousels.iter_mut().find(|c| c.id == id) {
                    row.status = status;
                }
                Ok(())
            })?;
        }
        Ok(found)
    }

    async fn update_carousel_if(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
    ) -> Result<bool, StoreError> {
        self.write(|t| replace_carousel_if(t, carousel, expected))
    }

    async fn delete_carousel(&self, id: Uuid) -> Result<(), StoreError> {
        self.write(|t| {
            t.carousels.retain(|c| c.id != id);
            t.slides.retain(|s| s.carousel_id != id);
            t.jobs.retain(|j| j.carousel_id != id);
            Ok(())
        })
    }

    async fn list_carousels(&self, project_id: Option<Uuid>) -> Result<Vec<Carousel>, StoreError> {
        self.read(|t| {
            let mut carousels: Vec<Carousel> = t
                .carousels
                .iter()
                .filter(|c| project_id.is_none_or(|id| c.project_id == id))
                .cloned()
                .collect();
            carousels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            carousels
        })
    }

    async fn list_carousels_by_status(
        &self,
        status: CarouselStatus,
    ) -> Result<Vec<Carousel>, StoreError> {
        self.read(|t| {
            t.carousels
                .iter()
                .filter(|c| c.status == status)
                .cloned()
                .collect()
        })
    }

    async fn list_slides(&self, carousel_id: Uuid) -> Result<Vec<Slide>, StoreError> {
        self.read(|t| {
            let mut slides: Vec<Slide> = t
                .slides
                .iter()
                .filter(|s| s.carousel_id == carousel_id)
                .cloned()
                .collect();
            slides.sort_by_key(|s| s.position);
            slides
        })
    }

    async fn insert_slides(&self, slides: &[Slide]) -> Result<(), StoreError> {
        if self.fail_slide_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("slide insert rejected".into()));
        }
        self.write(|t| {
            check_new_slides(t, slides)?;
            t.slides.extend_from_slice(slides);
            Ok(())
        })
    }

    async fn apply_copy(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
        updates: &[Slide],
        inserts: &[Slide],
    ) -> Result<bool, StoreError> {
        self.write(|t| {
            if !replace_carousel_if(t, carousel, expected)? {
                return Ok(false);
            }
            for slide in updates {
                let row = t
                    .slides
                    .iter_mut()
                    .find(|s| s.id == slide.id)
                    .ok_or(StoreError::Missing {
                        entity: "slide",
                        id: slide.id,
                    })?;
                row.headline = slide.headline.clone();
                row.subheadline = slide.subheadline.clone();
                row.bullets = slide.bullets.clone();
                row.cta_text = slide.cta_text.clone();
                row.updated_at = slide.updated_at;
            }
            check_new_slides(t, inserts)?;
            t.slides.extend_from_slice(inserts);
            Ok(true)
        })
    }

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        if self.fail_job_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("job insert rejected".into()));
        }
        self.write(|t| {
            t.jobs.push(job.clone());
            Ok(())
        })
    }

    async fn list_jobs(&self, carousel_id: Uuid) -> Result<Vec<Job>, StoreError> {
        self.read(|t| {
            t.jobs
                .iter()
                .filter(|j| j.carousel_id == carousel_id)
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Project) {
        let store = MemoryStore::new();
        let client = store.upsert_client(Client::new("Geral", "geral")).await.unwrap();
        let project = store
            .upsert_project(Project::new(client.id, "Rápidos", None))
            .await
            .unwrap();
        (store, project)
    }

    #[tokio::test]
    async fn upsert_client_is_idempotent_by_slug() {
        let store = MemoryStore::new();
        let first = store.upsert_client(Client::new("Geral", "geral")).await.unwrap();
        let second = store.upsert_client(Client::new("Outro nome", "geral")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_project_is_idempotent_per_client() {
        let (store, project) = seeded().await;
        let again = store
            .upsert_project(Project::new(project.client_id, "Rápidos", None))
            .await
            .unwrap();
        assert_eq!(again.id, project.id);
    }

    #[tokio::test]
    async fn update_if_rejects_stale_status() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();

        let mut approved = carousel.clone();
        approved.status = CarouselStatus::Approved;
        assert!(store.update_carousel_if(&approved, CarouselStatus::Draft).await.unwrap());

        let mut again = carousel.clone();
        again.status = CarouselStatus::Generating;
        assert!(!store.update_carousel_if(&again, CarouselStatus::Draft).await.unwrap());

        let stored = store.get_carousel(carousel.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CarouselStatus::Approved);
    }

    #[tokio::test]
    async fn insert_slides_rejects_duplicate_positions_atomically() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();

        let batch = vec![
            Slide::new(carousel.id, 1, "a"),
            Slide::new(carousel.id, 2, "b"),
            Slide::new(carousel.id, 2, "c"),
        ];
        let err = store.insert_slides(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.list_slides(carousel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slides_are_listed_by_position() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();
        store
            .insert_slides(&[Slide::new(carousel.id, 2, "b"), Slide::new(carousel.id, 1, "a")])
            .await
            .unwrap();

        let positions: Vec<u32> = store
            .list_slides(carousel.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.position)
            .collect();
        assert_eq!(positions, [1, 2]);
    }

    #[tokio::test]
    async fn delete_carousel_cascades() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();
        store.insert_slides(&[Slide::new(carousel.id, 1, "a")]).await.unwrap();

        store.delete_carousel(carousel.id).await.unwrap();
        assert!(store.get_carousel(carousel.id).await.unwrap().is_none());
        assert!(store.list_slides(carousel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn apply_copy_writes_row_and_slides_together() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();
        store.insert_slides(&[Slide::new(carousel.id, 1, "a")]).await.unwrap();

        let mut first = store.list_slides(carousel.id).await.unwrap().remove(0);
        first.headline = "novo".into();
        let mut updated = carousel.clone();
        updated.status = CarouselStatus::DraftWithCopy;

        let applied = store
            .apply_copy(&updated, CarouselStatus::Draft, &[first], &[Slide::new(carousel.id, 2, "b")])
            .await
            .unwrap();
        assert!(applied);

        let slides = store.list_slides(carousel.id).await.unwrap();
        assert_eq!(slides.iter().map(|s| s.headline.as_str()).collect::<Vec<_>>(), ["novo", "b"]);
        let stored = store.get_carousel(carousel.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CarouselStatus::DraftWithCopy);
    }

    #[tokio::test]
    async fn apply_copy_on_moved_status_writes_nothing() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Approved);
        store.insert_carousel(&carousel).await.unwrap();
        store.insert_slides(&[Slide::new(carousel.id, 1, "aprovado")]).await.unwrap();

        let mut rewritten = store.list_slides(carousel.id).await.unwrap().remove(0);
        rewritten.headline = "sobrescrito".into();
        let mut updated = carousel.clone();
        updated.status = CarouselStatus::DraftWithCopy;

        let applied = store
            .apply_copy(&updated, CarouselStatus::Draft, &[rewritten], &[Slide::new(carousel.id, 2, "b")])
            .await
            .unwrap();
        assert!(!applied);

        let slides = store.list_slides(carousel.id).await.unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].headline, "aprovado");
    }

    #[tokio::test]
    async fn failed_write_leaves_tables_unchanged() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();

        let mut updated = carousel.clone();
        updated.status = CarouselStatus::DraftWithCopy;
        let clash = [Slide::new(carousel.id, 1, "a"), Slide::new(carousel.id, 1, "b")];
        let err = store
            .apply_copy(&updated, CarouselStatus::Draft, &[], &clash)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Constraint(_)));
        let stored = store.get_carousel(carousel.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CarouselStatus::Draft);
        assert!(store.list_slides(carousel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn race_hook_moves_status_after_read() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::DraftWithCopy);
        store.insert_carousel(&carousel).await.unwrap();
        store.race_next_read(CarouselStatus::Approved);

        let seen = store.get_carousel(carousel.id).await.unwrap().unwrap();
        assert_eq!(seen.status, CarouselStatus::DraftWithCopy);
        let now = store.get_carousel(carousel.id).await.unwrap().unwrap();
        assert_eq!(now.status, CarouselStatus::Approved);
    }

    #[tokio::test]
    async fn injected_slide_failure() {
        let (store, project) = seeded().await;
        let carousel = Carousel::new(project.id, "t", CarouselStatus::Draft);
        store.insert_carousel(&carousel).await.unwrap();
        store.fail_slide_inserts(true);
        assert!(store.insert_slides(&[Slide::new(carousel.id, 1, "a")]).await.is_err());
    }
}
