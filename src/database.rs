//! database (db) union structure.
use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;

use crate::AppState;
use crate::account::{AccountRepository, MemoryAccountRepository, PgAccountRepository};
use crate::barber::{BarberRepository, MemoryBarberRepository, PgBarberRepository};
use crate::customer::{
    CustomerProfileRepository, MemoryCustomerProfileRepository, PgCustomerProfileRepository,
};
use crate::salon::{MemorySalonRepository, PgSalonRepository, SalonRepository};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "barberx";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Repositories shared by every route.
#[derive(Clone)]
pub struct Database {
    pub accounts: Arc<dyn AccountRepository>,
    pub salons: Arc<dyn SalonRepository>,
    pub barbers: Arc<dyn BarberRepository>,
    pub profiles: Arc<dyn CustomerProfileRepository>,
}

impl Database {
    /// Connect to PostgreSQL and apply pending migrations.
    pub async fn postgres(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        // execute migrations scripts on start.
        sqlx::migrate!().run(&postgres).await?;

        Ok(Self {
            accounts: Arc::new(PgAccountRepository::new(postgres.clone())),
            salons: Arc::new(PgSalonRepository::new(postgres.clone())),
            barbers: Arc::new(PgBarberRepository::new(postgres.clone())),
            profiles: Arc::new(PgCustomerProfileRepository::new(postgres)),
        })
    }

    /// Volatile store, lost on restart.
    pub fn memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountRepository::default()),
            salons: Arc::new(MemorySalonRepository::default()),
            barbers: Arc::new(MemoryBarberRepository::default()),
            profiles: Arc::new(MemoryCustomerProfileRepository::default()),
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Database {
        app_state.db.clone()
    }
}
