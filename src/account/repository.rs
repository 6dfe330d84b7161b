//! Account persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::{Account, Role};
use crate::error::{Result, ServerError};

/// Port for account persistence operations.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Find an account of the given role by (normalized) email.
    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>>;

    /// Find the account holding a password reset token.
    async fn find_by_reset_token(&self, token: &str) -> Result<Option<Account>>;

    /// Create a new account.
    async fn create(&self, account: &Account) -> Result<()>;

    /// Update an existing account.
    async fn update(&self, account: &Account) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct AccountRecord {
    id: Uuid,
    role: String,
    name: String,
    email: String,
    password: String,
    phone_number: Option<String>,
    profile_picture: Option<String>,
    status: Option<String>,
    reset_token: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRecord> for Account {
    type Error = ServerError;

    fn try_from(record: AccountRecord) -> Result<Self> {
        let id = record.id;
        let corrupted = move |err: String| ServerError::Internal {
            details: format!("corrupted account {id}: {err}"),
            source: None,
        };

        Ok(Self {
            id: record.id,
            role: record.role.parse::<Role>().map_err(corrupted)?,
            status: record
                .status
                .as_deref()
                .map(str::parse::<crate::account::ApprovalStatus>)
                .transpose()
                .map_err(corrupted)?,
            name: record.name,
            email: record.email,
            password: record.password,
            phone_number: record.phone_number,
            profile_picture: record.profile_picture,
            reset_token: record.reset_token,
            reset_expires_at: record.reset_expires_at,
            created_at: record.created_at,
        })
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, role, name, email, password, phone_number, profile_picture,
        status, reset_token, reset_expires_at, created_at
    FROM accounts
"#;

/// PostgreSQL account repository.
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new [`PgAccountRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, binds: &[&str]) -> Result<Option<Account>> {
        let sql = format!("{SELECT_ACCOUNT} WHERE {clause}");
        let mut query = sqlx::query_as::<_, AccountRecord>(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }

        query
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRecord>(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>> {
        self.fetch_one_where("role = $1 AND email = $2", &[role.as_str(), email])
            .await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<Account>> {
        self.fetch_one_where("reset_token = $1", &[token]).await
    }

    async fn create(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, role, name, email, password, phone_number,
                profile_picture, status, reset_token, reset_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(account.role.as_str())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password)
        .bind(&account.phone_number)
        .bind(&account.profile_picture)
        .bind(account.status.map(|s| s.as_str()))
        .bind(&account.reset_token)
        .bind(account.reset_expires_at)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, password = $4, phone_number = $5,
                profile_picture = $6, status = $7, reset_token = $8,
                reset_expires_at = $9
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password)
        .bind(&account.phone_number)
        .bind(&account.profile_picture)
        .bind(account.status.map(|s| s.as_str()))
        .bind(&account.reset_token)
        .bind(account.reset_expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory account repository.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<Uuid, Account>,
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.role == role && entry.email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.reset_token.as_deref() == Some(token))
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, account: &Account) -> Result<()> {
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        match self.accounts.get_mut(&account.id) {
            Some(mut entry) => {
                *entry = account.clone();
                Ok(())
            },
            None => Err(sqlx::Error::RowNotFound.into()),
        }
    }
}
