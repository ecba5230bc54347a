//! [`RecordStore`] sobre SQLite via `sqlx`.
//!
//! Transições de status usam `UPDATE ... WHERE id = ? AND status = ?`, então
//! dois processos concorrentes nunca aplicam a mesma transição duas vezes.
//! Escritas de várias linhas rodam numa transação.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};

use tracing::{debug, info};
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::lifecycle::CarouselStatus;
use crate::model::{Asset, BrandColors, Carousel, Client, Job, Project, Slide};

const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
            Some("2067" | "1555") => StoreError::Constraint(db_err.message().to_string()),
            // SQLITE_CONSTRAINT_FOREIGNKEY
            Some("787") => StoreError::Constraint(format!("foreign key: {}", db_err.message())),
            // SQLITE_BUSY / SQLITE_LOCKED
            Some("5" | "6") => StoreError::Unavailable(db_err.message().to_string()),
            _ => StoreError::Database(err.to_string()),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

fn parse_id(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("id {value:?}: {e}")))
}

/// Enum columns hold the serde name of the variant.
fn enum_text<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(StoreError::Corrupt(format!("not a unit variant: {other}"))),
    }
}

fn parse_enum<T: DeserializeOwned>(value: String) -> Result<T, StoreError> {
    Ok(serde_json::from_value(serde_json::Value::String(value))?)
}

fn parse_count(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    slug: String,
    brand_colors: String,
    instagram_handle: Option<String>,
    created_at: DateTime<Utc>,
}

impl ClientRow {
    fn into_client(self) -> Result<Client, StoreError> {
        Ok(Client {
            id: parse_id(&self.id)?,
            name: self.name,
            slug: self.slug,
            brand_colors: serde_json::from_str::<BrandColors>(&self.brand_colors)?,
            instagram_handle: self.instagram_handle,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    client_id: String,
    name: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self) -> Result<Project, StoreError> {
        Ok(Project {
            id: parse_id(&self.id)?,
            client_id: parse_id(&self.client_id)?,
            name: self.name,
            description: self.description,
            status: parse_enum(self.status)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: String,
    client_id: String,
    #[sqlx(rename = "type")]
    asset_type: String,
    filename: String,
    storage_url: String,
    mime_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl AssetRow {
    fn into_asset(self) -> Result<Asset, StoreError> {
        Ok(Asset {
            id: parse_id(&self.id)?,
            client_id: parse_id(&self.client_id)?,
            asset_type: parse_enum(self.asset_type)?,
            filename: self.filename,
            storage_url: self.storage_url,
            mime_type: self.mime_type,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CarouselRow {
    id: String,
    project_id: String,
    title: String,
    status: String,
    style_preset: String,
    niche: Option<String>,
    theme: Option<String>,
    objective: Option<String>,
    tone: Option<String>,
    cta_final: Option<String>,
    slides_count: i64,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CarouselRow {
    fn into_carousel(self) -> Result<Carousel, StoreError> {
        Ok(Carousel {
            id: parse_id(&self.id)?,
            project_id: parse_id(&self.project_id)?,
            title: self.title,
            status: self.status.parse().map_err(StoreError::Corrupt)?,
            style_preset: self.style_preset,
            niche: self.niche,
            theme: self.theme,
            objective: self.objective,
            tone: self.tone,
            cta_final: self.cta_final,
            slides_count: parse_count(self.slides_count, "slides_count")?,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SlideRow {
    id: String,
    carousel_id: String,
    position: i64,
    headline: String,
    subheadline: Option<String>,
    bullets: String,
    cta_text: Option<String>,
    bg_url: Option<String>,
    preview_url: Option<String>,
    hires_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SlideRow {
    fn into_slide(self) -> Result<Slide, StoreError> {
        Ok(Slide {
            id: parse_id(&self.id)?,
            carousel_id: parse_id(&self.carousel_id)?,
            position: parse_count(self.position, "position")?,
            headline: self.headline,
            subheadline: self.subheadline,
            bullets: serde_json::from_str(&self.bullets)?,
            cta_text: self.cta_text,
            bg_url: self.bg_url,
            preview_url: self.preview_url,
            hires_url: self.hires_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    carousel_id: String,
    #[sqlx(rename = "type")]
    job_type: String,
    status: String,
    payload: String,
    attempts: i64,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<Job, StoreError> {
        Ok(Job {
            id: parse_id(&self.id)?,
            carousel_id: parse_id(&self.carousel_id)?,
            job_type: parse_enum(self.job_type)?,
            status: parse_enum(self.status)?,
            payload: serde_json::from_str(&self.payload)?,
            attempts: parse_count(self.attempts, "attempts")?,
            created_at: self.created_at,
        })
    }
}

fn newest_first<T>(mut records: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    records.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    records
}

async fn exists(conn: &mut SqliteConnection, table: &str, id: Uuid) -> Result<bool, StoreError> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE id = ?"))
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(count > 0)
}

async fn replace_carousel_if(
    conn: &mut SqliteConnection,
    carousel: &Carousel,
    expected: CarouselStatus,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE carousels
        SET title = ?, status = ?, style_preset = ?, niche = ?, theme = ?, objective = ?,
            tone = ?, cta_final = ?, slides_count = ?, approved_at = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(&carousel.title)
    .bind(carousel.status.as_str())
    .bind(&carousel.style_preset)
    .bind(&carousel.niche)
    .bind(&carousel.theme)
    .bind(&carousel.objective)
    .bind(&carousel.tone)
    .bind(&carousel.cta_final)
    .bind(i64::from(carousel.slides_count))
    .bind(carousel.approved_at)
    .bind(carousel.updated_at)
    .bind(carousel.id.to_string())
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }
    if !exists(conn, "carousels", carousel.id).await? {
        return Err(StoreError::Missing {
            entity: "carousel",
            id: carousel.id,
        });
    }
    Ok(false)
}

async fn insert_slide(conn: &mut SqliteConnection, slide: &Slide) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO slides (
            id, carousel_id, position, headline, subheadline, bullets, cta_text,
            bg_url, preview_url, hires_url, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(slide.id.to_string())
    .bind(slide.carousel_id.to_string())
    .bind(i64::from(slide.position))
    .bind(&slide.headline)
    .bind(&slide.subheadline)
    .bind(serde_json::to_string(&slide.bullets)?)
    .bind(&slide.cta_text)
    .bind(&slide.bg_url)
    .bind(&slide.preview_url)
    .bind(&slide.hires_url)
    .bind(slide.created_at)
    .bind(slide.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

/// Rewrites the copy columns only; render URLs belong to the workers.
async fn update_slide_copy(conn: &mut SqliteConnection, slide: &Slide) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE slides
        SET headline = ?, subheadline = ?, bullets = ?, cta_text = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&slide.headline)
    .bind(&slide.subheadline)
    .bind(serde_json::to_string(&slide.bullets)?)
    .bind(&slide.cta_text)
    .bind(slide.updated_at)
    .bind(slide.id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Missing {
            entity: "slide",
            id: slide.id,
        });
    }
    Ok(())
}

/// Persistent record store backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply pending
    /// migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let store = Self { pool };
        store.migrate().await?;
        debug!(path = %path.as_ref().display(), "record store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if current < 1 {
            info!("applying migration 001: initial schema");
            for statement in INITIAL_SCHEMA.split(';') {
                let statement: String = statement
                    .lines()
                    .filter(|line| !line.trim().starts_with("--"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
            sqlx::query("INSERT INTO schema_version (version) VALUES (1)")
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}

impl RecordStore for SqliteStore {
    async fn upsert_client(&self, client: Client) -> Result<Client, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, slug, brand_colors, instagram_handle, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO NOTHING
            "#,
        )
        .bind(client.id.to_string())
        .bind(&client.name)
        .bind(&client.slug)
        .bind(serde_json::to_string(&client.brand_colors)?)
        .bind(&client.instagram_handle)
        .bind(client.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let row: ClientRow = sqlx::query_as("SELECT * FROM clients WHERE slug = ?")
            .bind(&client.slug)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        row.into_client()
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let rows: Vec<ClientRow> = sqlx::query_as("SELECT * FROM clients ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(ClientRow::into_client).collect()
    }

    async fn upsert_project(&self, project: Project) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        if !exists(&mut tx, "clients", project.client_id).await? {
            return Err(StoreError::Missing {
                entity: "client",
                id: project.client_id,
            });
        }
        sqlx::query(
            r#"
            INSERT INTO projects (id, client_id, name, description, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(client_id, name) DO NOTHING
            "#,
        )
        .bind(project.id.to_string())
        .bind(project.client_id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(enum_text(&project.status)?)
        .bind(project.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let row: ProjectRow = sqlx::query_as("SELECT * FROM projects WHERE client_id = ? AND name = ?")
            .bind(project.client_id.to_string())
            .bind(&project.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        row.into_project()
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(ProjectRow::into_project).transpose()
    }

    async fn list_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let rows: Vec<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE client_id = ?")
            .bind(client_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let projects = rows
            .into_iter()
            .map(ProjectRow::into_project)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(newest_first(projects, |p| p.created_at))
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        if !exists(&mut tx, "clients", asset.client_id).await? {
            return Err(StoreError::Missing {
                entity: "client",
                id: asset.client_id,
            });
        }
        sqlx::query(
            r#"
            INSERT INTO assets (id, client_id, type, filename, storage_url, mime_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.to_string())
        .bind(asset.client_id.to_string())
        .bind(enum_text(&asset.asset_type)?)
        .bind(&asset.filename)
        .bind(&asset.storage_url)
        .bind(&asset.mime_type)
        .bind(asset.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn list_assets(&self, client_id: Uuid) -> Result<Vec<Asset>, StoreError> {
        let rows: Vec<AssetRow> = sqlx::query_as("SELECT * FROM assets WHERE client_id = ?")
            .bind(client_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(AssetRow::into_asset).collect()
    }

    async fn insert_carousel(&self, carousel: &Carousel) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        if !exists(&mut tx, "projects", carousel.project_id).await? {
            return Err(StoreError::Missing {
                entity: "project",
                id: carousel.project_id,
            });
        }
        sqlx::query(
            r#"
            INSERT INTO carousels (
                id, project_id, title, status, style_preset, niche, theme, objective, tone,
                cta_final, slides_count, approved_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(carousel.id.to_string())
        .bind(carousel.project_id.to_string())
        .bind(&carousel.title)
        .bind(carousel.status.as_str())
        .bind(&carousel.style_preset)
        .bind(&carousel.niche)
        .bind(&carousel.theme)
        .bind(&carousel.objective)
        .bind(&carousel.tone)
        .bind(&carousel.cta_final)
        .bind(i64::from(carousel.slides_count))
        .bind(carousel.approved_at)
        .bind(carousel.created_at)
        .bind(carousel.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn get_carousel(&self, id: Uuid) -> Result<Option<Carousel>, StoreError> {
        let row: Option<CarouselRow> = sqlx::query_as("SELECT * FROM carousels WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(CarouselRow::into_carousel).transpose()
    }

    async fn update_carousel_if(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        replace_carousel_if(&mut conn, carousel, expected).await
    }

    async fn delete_carousel(&self, id: Uuid) -> Result<(), StoreError> {
        // Slides and jobs go with it (ON DELETE CASCADE).
        sqlx::query("DELETE FROM carousels WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_carousels(&self, project_id: Option<Uuid>) -> Result<Vec<Carousel>, StoreError> {
        let project_id = project_id.map(|id| id.to_string());
        let rows: Vec<CarouselRow> =
            sqlx::query_as("SELECT * FROM carousels WHERE ? IS NULL OR project_id = ?")
                .bind(&project_id)
                .bind(&project_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        let carousels = rows
            .into_iter()
            .map(CarouselRow::into_carousel)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(newest_first(carousels, |c| c.created_at))
    }

    async fn list_carousels_by_status(
        &self,
        status: CarouselStatus,
    ) -> Result<Vec<Carousel>, StoreError> {
        let rows: Vec<CarouselRow> = sqlx::query_as("SELECT * FROM carousels WHERE status = ?")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(CarouselRow::into_carousel).collect()
    }

    async fn list_slides(&self, carousel_id: Uuid) -> Result<Vec<Slide>, StoreError> {
        let rows: Vec<SlideRow> =
            sqlx::query_as("SELECT * FROM slides WHERE carousel_id = ? ORDER BY position")
                .bind(carousel_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        rows.into_iter().map(SlideRow::into_slide).collect()
    }

    async fn insert_slides(&self, slides: &[Slide]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for slide in slides {
            if !exists(&mut tx, "carousels", slide.carousel_id).await? {
                return Err(StoreError::Missing {
                    entity: "carousel",
                    id: slide.carousel_id,
                });
            }
            insert_slide(&mut tx, slide).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn apply_copy(
        &self,
        carousel: &Carousel,
        expected: CarouselStatus,
        updates: &[Slide],
        inserts: &[Slide],
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        if !replace_carousel_if(&mut tx, carousel, expected).await? {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(false);
        }
        for slide in updates {
            update_slide_copy(&mut tx, slide).await?;
        }
        for slide in inserts {
            insert_slide(&mut tx, slide).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, carousel_id, type, status, payload, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.carousel_id.to_string())
        .bind(enum_text(&job.job_type)?)
        .bind(enum_text(&job.status)?)
        .bind(job.payload.to_string())
        .bind(i64::from(job.attempts))
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_jobs(&self, carousel_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE carousel_id = ?")
            .bind(carousel_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let mut jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<Result<Vec<_>, _>>()?;
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }
}
