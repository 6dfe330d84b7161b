//! Salon management, for salon owners.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::account::ApprovalStatus;
use crate::error::{Result, ServerError};
use crate::middleware::Principal;
use crate::router::{Envelope, Path, Query, Valid};
use crate::salon::{Location, Offering, Salon, SalonPatch, SalonProfile, SalonService};

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    status: Option<ApprovalStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Metres.
    max_distance: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusBody {
    status: ApprovalStatus,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/my-salon", get(mine).put(update_mine).delete(delete_mine))
        .route("/all", get(all))
        .route("/approved", get(approved))
        .route("/listed", get(listed))
        .route("/all-listed", get(all_listed))
        .route("/search", get(search))
        .route("/nearby", get(nearby))
        .route("/services", post(add_offering))
        .route("/services/{index}", put(update_offering).delete(remove_offering))
        .route("/{id}", get(by_id))
        .route("/{id}/status", put(update_status))
}

async fn create(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<SalonProfile>,
) -> Result<(StatusCode, Envelope<Salon>)> {
    let salon = salons.create(principal.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(salon).message("Salon profile created successfully"),
    ))
}

async fn mine(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<Salon>> {
    Ok(Envelope::data(salons.mine(principal.id).await?))
}

async fn update_mine(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<SalonPatch>,
) -> Result<Envelope<Salon>> {
    let salon = salons.update_mine(principal.id, body).await?;
    Ok(Envelope::data(salon).message("Salon updated successfully"))
}

async fn delete_mine(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<()>> {
    salons.delete_mine(principal.id).await?;
    Ok(Envelope::done("Salon deleted successfully"))
}

async fn all(
    State(salons): State<SalonService>,
    Query(query): Query<StatusQuery>,
) -> Result<Envelope<Vec<Salon>>> {
    Ok(Envelope::list(salons.list(query.status).await?))
}

async fn approved(State(salons): State<SalonService>) -> Result<Envelope<Vec<Salon>>> {
    Ok(Envelope::list(salons.approved().await?))
}

pub(super) async fn listed(State(salons): State<SalonService>) -> Result<Envelope<Vec<Salon>>> {
    Ok(Envelope::list(salons.listed().await?))
}

async fn all_listed(State(salons): State<SalonService>) -> Result<Envelope<Vec<Salon>>> {
    Ok(Envelope::list(salons.all_listed().await?))
}

async fn search(
    State(salons): State<SalonService>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope<Vec<Salon>>> {
    let found = salons.search(query.q.as_deref().unwrap_or_default()).await?;
    Ok(Envelope::list(found))
}

async fn nearby(
    State(salons): State<SalonService>,
    Query(query): Query<NearbyQuery>,
) -> Result<Envelope<Vec<Salon>>> {
    let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
        return Err(ServerError::field(
            "latitude",
            "required",
            "Latitude and longitude are required",
        ));
    };
    Location::point(longitude, latitude).validate()?;
    if query
        .max_distance
        .is_some_and(|distance| !distance.is_finite() || distance <= 0.0)
    {
        return Err(ServerError::field(
            "maxDistance",
            "range",
            "Max distance must be a positive number",
        ));
    }

    let found = salons.nearby(latitude, longitude, query.max_distance).await?;
    Ok(Envelope::list(found))
}

async fn by_id(
    State(salons): State<SalonService>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Salon>> {
    Ok(Envelope::data(salons.get(id).await?))
}

async fn update_status(
    State(salons): State<SalonService>,
    Path(id): Path<Uuid>,
    Valid(body): Valid<StatusBody>,
) -> Result<Envelope<Salon>> {
    let salon = salons.update_status(id, body.status).await?;
    Ok(Envelope::data(salon).message(format!("Salon status updated to {}", body.status)))
}

async fn add_offering(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<Offering>,
) -> Result<(StatusCode, Envelope<Salon>)> {
    let salon = salons.add_offering(principal.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(salon).message("Service added successfully"),
    ))
}

async fn update_offering(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
    Path(index): Path<usize>,
    Valid(body): Valid<Offering>,
) -> Result<Envelope<Salon>> {
    let salon = salons.update_offering(principal.id, index, body).await?;
    Ok(Envelope::data(salon).message("Service updated successfully"))
}

async fn remove_offering(
    State(salons): State<SalonService>,
    Extension(principal): Extension<Principal>,
    Path(index): Path<usize>,
) -> Result<Envelope<Salon>> {
    let salon = salons.remove_offering(principal.id, index).await?;
    Ok(Envelope::data(salon).message("Service removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use crate::router::tests::{bearer, json};
    use crate::*;
    use axum::http::Method;
    use serde_json::json;

    fn profile() -> String {
        json!({
            "salonName": "Fade Factory",
            "address": "12 Main Street",
            "phoneNumber": "555-0100",
            "services": [{ "name": "Haircut", "price": 25.0, "duration": 30 }],
            "location": { "type": "Point", "coordinates": [2.3522, 48.8566] }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_role_gate() {
        let state = router::state();
        let app = app(state.clone());

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/salon/my-salon",
            None,
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/salon/my-salon",
            Some("not.a.token"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (_, customer) = bearer(&state, Role::Customer);
        let response = make_request(
            app,
            Method::GET,
            "/api/salon/my-salon",
            Some(&customer),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_salon_lifecycle() {
        let state = router::state();
        let app = app(state.clone());
        let (_, owner) = bearer(&state, Role::Owner);

        let response =
            make_request(app.clone(), Method::POST, "/api/salon", Some(&owner), profile()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["listingStatus"], "notListed");
        let id = body["data"]["id"].as_str().unwrap().to_owned();

        let response =
            make_request(app.clone(), Method::POST, "/api/salon", Some(&owner), profile()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = make_request(
            app.clone(),
            Method::PUT,
            &format!("/api/salon/{id}/status"),
            Some(&owner),
            json!({ "status": "approved" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["message"], "Salon status updated to approved");

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/salon/all?status=approved",
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(json(response).await["count"], 1);

        // Not listed until a barber is active.
        let response =
            make_request(app.clone(), Method::GET, "/api/salon/listed", Some(&owner), String::new())
                .await;
        assert_eq!(json(response).await["count"], 0);

        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/salon/services/3",
            Some(&owner),
            json!({ "name": "Shave", "price": 10.0, "duration": 15 }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(
            app.clone(),
            Method::DELETE,
            "/api/salon/my-salon",
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::GET,
            &format!("/api/salon/{id}"),
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let state = router::state();
        let app = app(state.clone());
        let (_, owner) = bearer(&state, Role::Owner);

        for path in [
            "/api/salon/search?q=a",
            "/api/salon/search",
            "/api/salon/nearby?latitude=48.85",
            "/api/salon/nearby?latitude=120&longitude=2.35",
            "/api/salon/nearby?latitude=north&longitude=2.35",
        ] {
            let response =
                make_request(app.clone(), Method::GET, path, Some(&owner), String::new()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        }

        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/salon/services/-1",
            Some(&owner),
            json!({ "name": "Haircut", "price": 25.0, "duration": 30 }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["title"], "Malformed path parameter.");

        let response = make_request(
            app,
            Method::GET,
            "/api/salon/nearby?latitude=48.85&longitude=2.35&maxDistance=1000",
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
