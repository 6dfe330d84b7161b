//! Barber management, for salon owners.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use uuid::Uuid;

use crate::AppState;
use crate::barber::{
    AvailabilityUpdate, Barber, BarberCount, BarberPatch, BarberProfile, BarberService,
};
use crate::error::Result;
use crate::middleware::Principal;
use crate::router::{Envelope, Path, Valid};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/my-barbers", get(mine))
        .route("/barber-count", get(count))
        .route("/{id}", get(by_id).put(update).delete(delete))
        .route("/{id}/availability", put(update_availability))
        .route("/{id}/activate", put(activate))
        .route("/{id}/deactivate", put(deactivate))
}

async fn create(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<BarberProfile>,
) -> Result<(StatusCode, Envelope<Barber>)> {
    let barber = barbers.create(principal.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(barber).message("Barber created successfully"),
    ))
}

async fn mine(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<Vec<Barber>>> {
    Ok(Envelope::list(barbers.mine(principal.id).await?))
}

async fn count(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<BarberCount>> {
    Ok(Envelope::data(barbers.count(principal.id).await?))
}

async fn by_id(
    State(barbers): State<BarberService>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Barber>> {
    Ok(Envelope::data(barbers.get(id).await?))
}

async fn update(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Valid(body): Valid<BarberPatch>,
) -> Result<Envelope<Barber>> {
    let barber = barbers.update(principal.id, id, body).await?;
    Ok(Envelope::data(barber).message("Barber updated successfully"))
}

async fn delete(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>> {
    barbers.delete(principal.id, id).await?;
    tracing::info!(barber_id = %id, owner_id = %principal.id, "barber deleted by owner");

    Ok(Envelope::done("Barber deleted successfully"))
}

async fn update_availability(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Valid(body): Valid<AvailabilityUpdate>,
) -> Result<Envelope<Barber>> {
    let barber = barbers
        .update_availability(principal.id, id, body.availability)
        .await?;
    Ok(Envelope::data(barber).message("Barber availability updated successfully"))
}

async fn activate(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Barber>> {
    let barber = barbers.activate(principal.id, id).await?;
    Ok(Envelope::data(barber).message("Barber activated successfully"))
}

async fn deactivate(
    State(barbers): State<BarberService>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Barber>> {
    let barber = barbers.deactivate(principal.id, id).await?;
    Ok(Envelope::data(barber).message("Barber deactivated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use crate::router::tests::{bearer, json};
    use crate::*;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_barber_activity_drives_listing() {
        let state = router::state();
        let app = app(state.clone());
        let (_, owner) = bearer(&state, Role::Owner);

        // No salon yet.
        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/owner/barber",
            Some(&owner),
            json!({ "name": "Sam" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/salon",
            Some(&owner),
            json!({
                "salonName": "Fade Factory",
                "address": "12 Main Street",
                "phoneNumber": "555-0100"
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/owner/barber",
            Some(&owner),
            json!({ "name": "Sam", "specialties": ["Fades"] }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json(response).await["data"]["id"].as_str().unwrap().to_owned();

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/owner/barber/barber-count",
            Some(&owner),
            String::new(),
        )
        .await;
        let body = json(response).await;
        assert_eq!(body["data"]["barberCount"], 1);
        assert_eq!(body["data"]["listingStatus"], "listed");

        let response = make_request(
            app.clone(),
            Method::PUT,
            &format!("/api/owner/barber/{id}/deactivate"),
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["data"]["isActive"], false);

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/owner/barber/barber-count",
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(json(response).await["data"]["listingStatus"], "notListed");

        // Another owner cannot touch the barber.
        let (_, stranger) = bearer(&state, Role::Owner);
        let response = make_request(
            app,
            Method::PUT,
            &format!("/api/owner/barber/{id}/activate"),
            Some(&stranger),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_availability() {
        let state = router::state();
        let app = app(state.clone());
        let (_, owner) = bearer(&state, Role::Owner);

        let response = make_request(
            app,
            Method::PUT,
            &format!("/api/owner/barber/{}/availability", Uuid::new_v4()),
            Some(&owner),
            json!({ "availability": [{ "day": "Monday", "startTime": "", "endTime": "18:00" }] })
                .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
