//! Registros persistidos: clientes, projetos, carrosséis, lâminas, jobs e assets.
//!
//! Todos derivam `Serialize`/`Deserialize` para a saída `--json` da CLI; enums
//! são gravados no store pelo mesmo nome serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::CarouselStatus;

pub const DEFAULT_STYLE_PRESET: &str = "modern_clean";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

/// An agency client. `slug` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub brand_colors: BrandColors,
    pub instagram_handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            brand_colors: BrandColors::default(),
            instagram_handle: None,
            created_at: Utc::now(),
        }
    }
}

/// Derive a url-safe slug from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
}

/// A project groups carousels for a client. `(client_id, name)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(client_id: Uuid, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            name: name.into(),
            description,
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Logo,
    Icon,
    Pattern,
    Photo,
}

/// Metadata of an uploaded brand asset. Upload itself happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub filename: String,
    pub storage_url: String,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The top-level content record. Mutated only through the orchestration
/// handlers in [`crate::service`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carousel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: CarouselStatus,
    pub style_preset: String,
    pub niche: Option<String>,
    pub theme: Option<String>,
    pub objective: Option<String>,
    pub tone: Option<String>,
    pub cta_final: Option<String>,
    pub slides_count: u32,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carousel {
    pub fn new(project_id: Uuid, title: impl Into<String>, status: CarouselStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            status,
            style_preset: DEFAULT_STYLE_PRESET.to_string(),
            niche: None,
            theme: None,
            objective: None,
            tone: None,
            cta_final: None,
            slides_count: 0,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One page of a carousel. `position` is 1-based and dense per carousel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: Uuid,
    pub carousel_id: Uuid,
    pub position: u32,
    pub headline: String,
    pub subheadline: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    pub cta_text: Option<String>,
    // Owned by the render workers.
    pub bg_url: Option<String>,
    pub preview_url: Option<String>,
    pub hires_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slide {
    pub fn new(carousel_id: Uuid, position: u32, headline: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            carousel_id,
            position,
            headline: headline.into(),
            subheadline: None,
            bullets: Vec::new(),
            cta_text: None,
            bg_url: None,
            preview_url: None,
            hires_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Render pipeline stage a job row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    GenerateLayout,
    GenerateBg,
    RenderPreview,
    Validate,
    RenderHires,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Tracking record correlating a queue submission with a carousel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub carousel_id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A freshly accepted submission. `queue_job_id` is the id the queue
    /// returned on enqueue.
    pub fn queued(carousel_id: Uuid, job_type: JobType, queue_job_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            carousel_id,
            job_type,
            status: JobStatus::Queued,
            payload: serde_json::json!({ "queue_job_id": queue_job_id }),
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    pub fn queue_job_id(&self) -> Option<&str> {
        self.payload.get("queue_job_id").and_then(|v| v.as_str())
    }
}

/// A carousel together with its slides ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselWithSlides {
    #[serde(flatten)]
    pub carousel: Carousel,
    pub slides: Vec<Slide>,
}
