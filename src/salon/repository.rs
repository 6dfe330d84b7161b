//! Salon persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::account::ApprovalStatus;
use crate::error::Result;
use crate::salon::{ListingStatus, Salon};

/// Criteria for salon listings. Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SalonFilter {
    pub status: Option<ApprovalStatus>,
    pub listing_status: Option<ListingStatus>,
}

impl SalonFilter {
    /// Salons visible to the public.
    pub fn public() -> Self {
        Self {
            status: Some(ApprovalStatus::Approved),
            listing_status: Some(ListingStatus::Listed),
        }
    }

    pub fn matches(&self, salon: &Salon) -> bool {
        self.status.is_none_or(|status| salon.status == status)
            && self
                .listing_status
                .is_none_or(|listing| salon.listing_status == listing)
    }
}

/// Port for salon persistence operations.
#[async_trait]
pub trait SalonRepository: Send + Sync {
    /// Find a salon by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Salon>>;

    /// Find the salon of an owner.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Salon>>;

    /// List salons matching `filter`, newest first.
    async fn list(&self, filter: SalonFilter) -> Result<Vec<Salon>>;

    /// Create a new salon.
    async fn create(&self, salon: &Salon) -> Result<()>;

    /// Replace an existing salon.
    async fn update(&self, salon: &Salon) -> Result<()>;

    /// Delete a salon. Returns `false` if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// PostgreSQL salon repository.
///
/// Salons are stored as JSONB documents; filtered columns are duplicated
/// next to the document.
pub struct PgSalonRepository {
    pool: PgPool,
}

impl PgSalonRepository {
    /// Create a new [`PgSalonRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalonRepository for PgSalonRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Salon>> {
        let salon = sqlx::query_scalar::<_, Json<Salon>>(
            r#"SELECT document FROM salons WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salon.map(|Json(salon)| salon))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Salon>> {
        let salon = sqlx::query_scalar::<_, Json<Salon>>(
            r#"SELECT document FROM salons WHERE owner_id = $1"#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salon.map(|Json(salon)| salon))
    }

    async fn list(&self, filter: SalonFilter) -> Result<Vec<Salon>> {
        let salons = sqlx::query_scalar::<_, Json<Salon>>(
            r#"
            SELECT document FROM salons
            WHERE ($1::TEXT IS NULL OR status = $1)
                AND ($2::TEXT IS NULL OR listing_status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.listing_status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(salons.into_iter().map(|Json(salon)| salon).collect())
    }

    async fn create(&self, salon: &Salon) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO salons (id, owner_id, status, listing_status, created_at, document)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(salon.id)
        .bind(salon.owner_id)
        .bind(salon.status.as_str())
        .bind(salon.listing_status.as_str())
        .bind(salon.created_at)
        .bind(Json(salon))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, salon: &Salon) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE salons SET status = $2, listing_status = $3, document = $4
            WHERE id = $1
            "#,
        )
        .bind(salon.id)
        .bind(salon.status.as_str())
        .bind(salon.listing_status.as_str())
        .bind(Json(salon))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM salons WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory salon repository.
#[derive(Default)]
pub struct MemorySalonRepository {
    salons: DashMap<Uuid, Salon>,
}

#[async_trait]
impl SalonRepository for MemorySalonRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Salon>> {
        Ok(self.salons.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Salon>> {
        Ok(self
            .salons
            .iter()
            .find(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: SalonFilter) -> Result<Vec<Salon>> {
        let mut salons: Vec<Salon> = self
            .salons
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        salons.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(salons)
    }

    async fn create(&self, salon: &Salon) -> Result<()> {
        self.salons.insert(salon.id, salon.clone());
        Ok(())
    }

    async fn update(&self, salon: &Salon) -> Result<()> {
        match self.salons.get_mut(&salon.id) {
            Some(mut entry) => {
                *entry = salon.clone();
                Ok(())
            },
            None => Err(sqlx::Error::RowNotFound.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.salons.remove(&id).is_some())
    }
}
