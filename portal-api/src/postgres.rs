use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, types::Json};
use tracing::info;
use uuid::Uuid;

use crate::models::{ApplicationRecord, ApplicationStatus, ClaimRecord, Page};
use crate::store::{DocumentStore, ReviewOutcome, StoreError};

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS applications (
        seq BIGSERIAL PRIMARY KEY,
        id UUID NOT NULL UNIQUE,
        body JSONB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS claims (
        seq BIGSERIAL PRIMARY KEY,
        id UUID NOT NULL UNIQUE,
        body JSONB NOT NULL
    )",
];

/// Document store keeping each record as a JSONB body
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!("document store schema ready");
        Ok(Self { pool })
    }
}

fn decode_body<T: DeserializeOwned>(row: &sqlx::postgres::PgRow) -> Result<T, StoreError> {
    let Json(body) = row.try_get::<Json<T>, _>("body")?;
    Ok(body)
}

fn page_bounds(page: Page) -> (i64, i64) {
    (page.limit as i64, page.offset() as i64)
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert_application(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO applications (id, body) VALUES ($1, $2)")
            .bind(record.id)
            .bind(Json(record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_applications(&self, page: Page) -> Result<Vec<ApplicationRecord>, StoreError> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query("SELECT body FROM applications ORDER BY seq LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_body).collect()
    }

    async fn review_application(
        &self,
        id: Uuid,
        decision: ApplicationStatus,
    ) -> Result<ReviewOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT body FROM applications WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(ReviewOutcome::NotFound);
        };

        let mut record: ApplicationRecord = decode_body(&row)?;
        if record.status != ApplicationStatus::Pending {
            return Ok(ReviewOutcome::AlreadyReviewed(record.status));
        }
        record.status = decision;

        sqlx::query("UPDATE applications SET body = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&record))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(ReviewOutcome::Reviewed(record))
    }

    async fn insert_claim(&self, record: &ClaimRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO claims (id, body) VALUES ($1, $2)")
            .bind(record.id)
            .bind(Json(record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_claims(&self, page: Page) -> Result<Vec<ClaimRecord>, StoreError> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query("SELECT body FROM claims ORDER BY seq LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_body).collect()
    }
}
