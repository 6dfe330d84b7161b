//! Customer profile persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::customer::{CustomerProfile, MembershipTier};
use crate::error::Result;

/// Criteria for profile listings. Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CustomerFilter {
    pub membership_tier: Option<MembershipTier>,
    pub is_active: Option<bool>,
}

impl CustomerFilter {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, profile: &CustomerProfile) -> bool {
        self.membership_tier
            .is_none_or(|tier| profile.membership_tier == tier)
            && self.is_active.is_none_or(|active| profile.is_active == active)
    }
}

/// Port for customer profile persistence operations.
#[async_trait]
pub trait CustomerProfileRepository: Send + Sync {
    /// Find a profile by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>>;

    /// Find the profile of a customer account.
    async fn find_by_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>>;

    /// List profiles matching `filter`, newest first.
    async fn list(&self, filter: CustomerFilter) -> Result<Vec<CustomerProfile>>;

    /// Create a new profile.
    async fn create(&self, profile: &CustomerProfile) -> Result<()>;

    /// Replace an existing profile.
    async fn update(&self, profile: &CustomerProfile) -> Result<()>;

    /// Delete a profile. Returns `false` if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// PostgreSQL customer profile repository.
pub struct PgCustomerProfileRepository {
    pool: PgPool,
}

impl PgCustomerProfileRepository {
    /// Create a new [`PgCustomerProfileRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerProfileRepository for PgCustomerProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>> {
        let profile = sqlx::query_scalar::<_, Json<CustomerProfile>>(
            r#"SELECT document FROM customer_profiles WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile.map(|Json(profile)| profile))
    }

    async fn find_by_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>> {
        let profile = sqlx::query_scalar::<_, Json<CustomerProfile>>(
            r#"SELECT document FROM customer_profiles WHERE customer_id = $1"#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile.map(|Json(profile)| profile))
    }

    async fn list(&self, filter: CustomerFilter) -> Result<Vec<CustomerProfile>> {
        let profiles = sqlx::query_scalar::<_, Json<CustomerProfile>>(
            r#"
            SELECT document FROM customer_profiles
            WHERE ($1::TEXT IS NULL OR membership_tier = $1)
                AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.membership_tier.map(|tier| tier.as_str()))
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles.into_iter().map(|Json(profile)| profile).collect())
    }

    async fn create(&self, profile: &CustomerProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_profiles (id, customer_id, membership_tier,
                loyalty_points, is_active, created_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id)
        .bind(profile.customer_id)
        .bind(profile.membership_tier.as_str())
        .bind(profile.loyalty_points)
        .bind(profile.is_active)
        .bind(profile.created_at)
        .bind(Json(profile))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, profile: &CustomerProfile) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE customer_profiles
            SET membership_tier = $2, loyalty_points = $3, is_active = $4, document = $5
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(profile.membership_tier.as_str())
        .bind(profile.loyalty_points)
        .bind(profile.is_active)
        .bind(Json(profile))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM customer_profiles WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory customer profile repository.
#[derive(Default)]
pub struct MemoryCustomerProfileRepository {
    profiles: DashMap<Uuid, CustomerProfile>,
}

#[async_trait]
impl CustomerProfileRepository for MemoryCustomerProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>> {
        Ok(self.profiles.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>> {
        Ok(self
            .profiles
            .iter()
            .find(|entry| entry.customer_id == customer_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: CustomerFilter) -> Result<Vec<CustomerProfile>> {
        let mut profiles: Vec<CustomerProfile> = self
            .profiles
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(profiles)
    }

    async fn create(&self, profile: &CustomerProfile) -> Result<()> {
        self.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update(&self, profile: &CustomerProfile) -> Result<()> {
        match self.profiles.get_mut(&profile.id) {
            Some(mut entry) => {
                *entry = profile.clone();
                Ok(())
            },
            None => Err(sqlx::Error::RowNotFound.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.profiles.remove(&id).is_some())
    }
}
