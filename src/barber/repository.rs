//! Barber persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::barber::Barber;
use crate::error::Result;

/// Criteria for barber listings. Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BarberFilter {
    pub salon_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl BarberFilter {
    /// Active barbers, optionally of a single salon.
    pub fn active(salon_id: Option<Uuid>) -> Self {
        Self {
            salon_id,
            is_active: Some(true),
        }
    }

    pub fn matches(&self, barber: &Barber) -> bool {
        self.salon_id.is_none_or(|id| barber.salon_id == id)
            && self.is_active.is_none_or(|active| barber.is_active == active)
    }
}

/// Port for barber persistence operations.
#[async_trait]
pub trait BarberRepository: Send + Sync {
    /// Find a barber by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Barber>>;

    /// List barbers matching `filter`, newest first.
    async fn list(&self, filter: BarberFilter) -> Result<Vec<Barber>>;

    /// Number of active barbers of a salon.
    async fn count_active(&self, salon_id: Uuid) -> Result<u64>;

    /// Create a new barber.
    async fn create(&self, barber: &Barber) -> Result<()>;

    /// Replace an existing barber.
    async fn update(&self, barber: &Barber) -> Result<()>;

    /// Delete every barber of a salon. Returns how many were deleted.
    async fn delete_by_salon(&self, salon_id: Uuid) -> Result<u64>;
}

/// PostgreSQL barber repository.
pub struct PgBarberRepository {
    pool: PgPool,
}

impl PgBarberRepository {
    /// Create a new [`PgBarberRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BarberRepository for PgBarberRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Barber>> {
        let barber = sqlx::query_scalar::<_, Json<Barber>>(
            r#"SELECT document FROM barbers WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(barber.map(|Json(barber)| barber))
    }

    async fn list(&self, filter: BarberFilter) -> Result<Vec<Barber>> {
        let barbers = sqlx::query_scalar::<_, Json<Barber>>(
            r#"
            SELECT document FROM barbers
            WHERE ($1::UUID IS NULL OR salon_id = $1)
                AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.salon_id)
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(barbers.into_iter().map(|Json(barber)| barber).collect())
    }

    async fn count_active(&self, salon_id: Uuid) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM barbers WHERE salon_id = $1 AND is_active"#,
        )
        .bind(salon_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn create(&self, barber: &Barber) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO barbers (id, salon_id, is_active, created_at, document)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(barber.id)
        .bind(barber.salon_id)
        .bind(barber.is_active)
        .bind(barber.created_at)
        .bind(Json(barber))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, barber: &Barber) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE barbers SET is_active = $2, document = $3 WHERE id = $1"#,
        )
        .bind(barber.id)
        .bind(barber.is_active)
        .bind(Json(barber))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    async fn delete_by_salon(&self, salon_id: Uuid) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM barbers WHERE salon_id = $1"#)
            .bind(salon_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// In-memory barber repository.
#[derive(Default)]
pub struct MemoryBarberRepository {
    barbers: DashMap<Uuid, Barber>,
}

#[async_trait]
impl BarberRepository for MemoryBarberRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Barber>> {
        Ok(self.barbers.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: BarberFilter) -> Result<Vec<Barber>> {
        let mut barbers: Vec<Barber> = self
            .barbers
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        barbers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(barbers)
    }

    async fn count_active(&self, salon_id: Uuid) -> Result<u64> {
        let filter = BarberFilter::active(Some(salon_id));
        Ok(self
            .barbers
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }

    async fn create(&self, barber: &Barber) -> Result<()> {
        self.barbers.insert(barber.id, barber.clone());
        Ok(())
    }

    async fn update(&self, barber: &Barber) -> Result<()> {
        match self.barbers.get_mut(&barber.id) {
            Some(mut entry) => {
                *entry = barber.clone();
                Ok(())
            },
            None => Err(sqlx::Error::RowNotFound.into()),
        }
    }

    async fn delete_by_salon(&self, salon_id: Uuid) -> Result<u64> {
        let before = self.barbers.len();
        self.barbers.retain(|_, barber| barber.salon_id != salon_id);

        Ok((before - self.barbers.len()) as u64)
    }
}
