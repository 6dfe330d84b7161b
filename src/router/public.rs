//! Public discovery routes. No authentication.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::barber::{Barber, BarberService};
use crate::error::Result;
use crate::router::salon::{SearchQuery, listed};
use crate::router::{Envelope, Path, Query};

#[derive(Debug, Default, Deserialize)]
pub struct SpecialtyQuery {
    specialty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub db: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/salons", get(listed))
        .route("/barbers", get(barbers))
        .route("/barbers/search", get(search))
        .route("/barbers/specialty/{specialty}", get(by_specialty))
        .route("/barbers/top-rated", get(top_rated))
        .route("/barbers/salon/{salon_id}", get(by_salon))
        .route("/barbers/{id}", get(by_id))
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_owned(),
        db: "connected".to_owned(),
    })
}

async fn barbers(
    State(barbers): State<BarberService>,
    Query(query): Query<SpecialtyQuery>,
) -> Result<Envelope<Vec<Barber>>> {
    Ok(Envelope::list(barbers.active(query.specialty.as_deref()).await?))
}

async fn search(
    State(barbers): State<BarberService>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope<Vec<Barber>>> {
    let found = barbers.search(query.q.as_deref().unwrap_or_default()).await?;
    Ok(Envelope::list(found))
}

async fn by_specialty(
    State(barbers): State<BarberService>,
    Path(specialty): Path<String>,
) -> Result<Envelope<Vec<Barber>>> {
    Ok(Envelope::list(barbers.by_specialty(&specialty).await?))
}

async fn top_rated(
    State(barbers): State<BarberService>,
    Query(query): Query<LimitQuery>,
) -> Result<Envelope<Vec<Barber>>> {
    Ok(Envelope::list(barbers.top_rated(query.limit).await?))
}

async fn by_salon(
    State(barbers): State<BarberService>,
    Path(salon_id): Path<Uuid>,
) -> Result<Envelope<Vec<Barber>>> {
    Ok(Envelope::list(barbers.by_salon(salon_id).await?))
}

async fn by_id(
    State(barbers): State<BarberService>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Barber>> {
    Ok(Envelope::data(barbers.get(id).await?))
}
