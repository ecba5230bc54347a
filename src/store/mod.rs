//! Contrato do store de registros.
//!
//! Cada escrita é atômica por linha. [`RecordStore::insert_slides`] grava o
//! lote inteiro ou nada, e [`RecordStore::apply_copy`] grava a linha do
//! carrossel e suas lâminas numa única transação guardada pelo status.

#[cfg(test)]
mod memory;
mod sqlite;

use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::CarouselStatus;
use crate::model::{Asset, Carousel, Client, Job, Project, Slide};

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: Uuid },

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The database is locked or unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded into its record type.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
}

#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn upsert_client(&self, client: Client) -> Result<Client, StoreError>;
    async fn list_clients(&self) -> Result<Vec<Client>, StoreError>;

    /// Insert a project, or return the existing one with the same
    /// `(client_id, name)`.
    async fn upsert_project(&self, project: Project) -> Result<Project, StoreError>;
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;
    async fn list_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError>;

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError>;
    async fn list_assets(&self, client_id: Uuid) -> Result<Vec<Asset>, StoreError>;

    async fn insert_carousel(&self, carousel: &Carousel) -> Result<(), StoreError>;
    async fn get_carousel(&self, id: Uuid) -> Result<Option<Carousel>, StoreError>;

    /// Overwrite the row only if its stored status still equals `expected`.
    /// Returns `false` and writes nothing otherwise.
    async fn update_carousel_if(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
    ) -> Result<bool, StoreError>;
    async fn delete_carousel(&self, id: Uuid) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_carousels(&self, project_id: Option<Uuid>) -> Result<Vec<Carousel>, StoreError>;
    async fn list_carousels_by_status(
        &self,
        status: CarouselStatus,
    ) -> Result<Vec<Carousel>, StoreError>;

    /// Ordered by position.
    async fn list_slides(&self, carousel_id: Uuid) -> Result<Vec<Slide>, StoreError>;
    /// All or nothing.
    async fn insert_slides(&self, slides: &[Slide]) -> Result<(), StoreError>;

    /// Overwrite the carousel row (compare-and-swap on `expected`, as
    /// [`update_carousel_if`](Self::update_carousel_if)), rewrite `updates`
    /// and add `inserts`, in one transaction. Returns `false` and writes
    /// nothing if the status moved.
    async fn apply_copy(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
        updates: &[Slide],
        inserts: &[Slide],
    ) -> Result<bool, StoreError>;

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;
    async fn list_jobs(&self, carousel_id: Uuid) -> Result<Vec<Job>, StoreError>;
}
