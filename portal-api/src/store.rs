use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ApplicationRecord, ApplicationStatus, ClaimRecord, Page};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of an approve/reject request
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Reviewed(ApplicationRecord),
    NotFound,
    AlreadyReviewed(ApplicationStatus),
}

/// Persistence for applications and claims. Listing returns records in
/// insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_application(&self, record: &ApplicationRecord) -> Result<(), StoreError>;
    async fn list_applications(&self, page: Page) -> Result<Vec<ApplicationRecord>, StoreError>;
    async fn review_application(
        &self,
        id: Uuid,
        decision: ApplicationStatus,
    ) -> Result<ReviewOutcome, StoreError>;
    async fn insert_claim(&self, record: &ClaimRecord) -> Result<(), StoreError>;
    async fn list_claims(&self, page: Page) -> Result<Vec<ClaimRecord>, StoreError>;
}

/// In-memory implementation of DocumentStore
#[derive(Default)]
pub struct InMemoryDocumentStore {
    applications: RwLock<Vec<ApplicationRecord>>,
    claims: RwLock<Vec<ClaimRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(records: &[T], page: Page) -> Vec<T> {
    records
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_application(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        self.applications.write().await.push(record.clone());
        Ok(())
    }

    async fn list_applications(&self, page: Page) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(paginate(&self.applications.read().await, page))
    }

    async fn review_application(
        &self,
        id: Uuid,
        decision: ApplicationStatus,
    ) -> Result<ReviewOutcome, StoreError> {
        let mut applications = self.applications.write().await;
        let Some(record) = applications.iter_mut().find(|r| r.id == id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if record.status != ApplicationStatus::Pending {
            return Ok(ReviewOutcome::AlreadyReviewed(record.status));
        }
        record.status = decision;
        Ok(ReviewOutcome::Reviewed(record.clone()))
    }

    async fn insert_claim(&self, record: &ClaimRecord) -> Result<(), StoreError> {
        self.claims.write().await.push(record.clone());
        Ok(())
    }

    async fn list_claims(&self, page: Page) -> Result<Vec<ClaimRecord>, StoreError> {
        Ok(paginate(&self.claims.read().await, page))
    }
}
