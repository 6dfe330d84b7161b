//! Customer profiles and loyalty, for customers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::customer::{
    Booking, CustomerFilter, CustomerProfile, CustomerProfileForm, CustomerProfilePatch,
    CustomerProfileService, EmergencyContact, MembershipTier, NotificationsPatch, PointsAction,
};
use crate::error::{Result, ServerError};
use crate::middleware::Principal;
use crate::router::salon::SearchQuery;
use crate::router::{Envelope, Json, Path, Query, Valid};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    membership_tier: Option<MembershipTier>,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoyaltyPointsBody {
    #[validate(range(min = 1, message = "Points must be a positive number"))]
    points: i64,
    action: PointsAction,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteServiceBody {
    #[validate(length(min = 2, message = "Service name must be at least 2 characters long"))]
    service_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/my-profile", get(mine).put(update_mine).delete(delete_mine))
        .route("/all", get(all))
        .route("/active", get(active))
        .route("/search", get(search))
        .route("/membership/{tier}", get(by_tier))
        .route("/top-loyalty", get(top_loyalty))
        .route("/booking-history", post(add_booking))
        .route(
            "/preferred-salons/{salon_id}",
            post(add_preferred_salon).delete(remove_preferred_salon),
        )
        .route("/notification-preferences", put(update_notifications))
        .route("/emergency-contact", put(update_emergency_contact))
        .route("/favorite-services", post(add_favorite_service))
        .route(
            "/favorite-services/{service_name}",
            axum::routing::delete(remove_favorite_service),
        )
        .route("/deactivate", put(deactivate))
        .route("/reactivate", put(reactivate))
        .route("/{id}", get(by_id))
        // `id` is the customer account ID here.
        .route("/{id}/loyalty-points", put(adjust_points))
}

async fn create(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<CustomerProfileForm>,
) -> Result<(StatusCode, Envelope<CustomerProfile>)> {
    let profile = profiles.create(principal.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(profile).message("Customer profile created successfully"),
    ))
}

async fn mine(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<CustomerProfile>> {
    Ok(Envelope::data(profiles.mine(principal.id).await?))
}

async fn update_mine(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<CustomerProfilePatch>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.update_mine(principal.id, body).await?;
    Ok(Envelope::data(profile).message("Customer profile updated successfully"))
}

async fn delete_mine(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<()>> {
    profiles.delete_mine(principal.id).await?;
    Ok(Envelope::done("Customer profile deleted successfully"))
}

async fn all(
    State(profiles): State<CustomerProfileService>,
    Query(query): Query<ListQuery>,
) -> Result<Envelope<Vec<CustomerProfile>>> {
    let found = profiles
        .list(CustomerFilter {
            membership_tier: query.membership_tier,
            is_active: query.is_active,
        })
        .await?;
    Ok(Envelope::list(found))
}

async fn active(
    State(profiles): State<CustomerProfileService>,
) -> Result<Envelope<Vec<CustomerProfile>>> {
    Ok(Envelope::list(profiles.active().await?))
}

async fn search(
    State(profiles): State<CustomerProfileService>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope<Vec<CustomerProfile>>> {
    let found = profiles.search(query.q.as_deref().unwrap_or_default()).await?;
    Ok(Envelope::list(found))
}

async fn by_tier(
    State(profiles): State<CustomerProfileService>,
    Path(tier): Path<String>,
) -> Result<Envelope<Vec<CustomerProfile>>> {
    let tier = tier.to_lowercase().parse::<MembershipTier>().map_err(|_| {
        ServerError::field(
            "tier",
            "invalid",
            "Invalid membership tier. Must be one of: bronze, silver, gold, platinum",
        )
    })?;

    Ok(Envelope::list(profiles.by_tier(tier).await?))
}

async fn top_loyalty(
    State(profiles): State<CustomerProfileService>,
    Query(query): Query<LimitQuery>,
) -> Result<Envelope<Vec<CustomerProfile>>> {
    Ok(Envelope::list(profiles.top_loyalty(query.limit).await?))
}

async fn by_id(
    State(profiles): State<CustomerProfileService>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<CustomerProfile>> {
    Ok(Envelope::data(profiles.get(id).await?))
}

async fn adjust_points(
    State(profiles): State<CustomerProfileService>,
    Path(customer_id): Path<Uuid>,
    Valid(body): Valid<LoyaltyPointsBody>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles
        .adjust_points(customer_id, body.points, body.action)
        .await?;
    let verb = match body.action {
        PointsAction::Add => "added",
        PointsAction::Deduct => "deducted",
    };

    Ok(Envelope::data(profile).message(format!("Loyalty points {verb} successfully")))
}

async fn add_booking(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<Booking>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.add_booking(principal.id, body).await?;
    Ok(Envelope::data(profile).message("Booking history added successfully"))
}

async fn add_preferred_salon(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Path(salon_id): Path<Uuid>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.add_preferred_salon(principal.id, salon_id).await?;
    Ok(Envelope::data(profile).message("Preferred salon added successfully"))
}

async fn remove_preferred_salon(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Path(salon_id): Path<Uuid>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles
        .remove_preferred_salon(principal.id, salon_id)
        .await?;
    Ok(Envelope::data(profile).message("Preferred salon removed successfully"))
}

async fn update_notifications(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NotificationsPatch>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.update_notifications(principal.id, body).await?;
    Ok(Envelope::data(profile).message("Notification preferences updated successfully"))
}

async fn update_emergency_contact(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<EmergencyContact>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles
        .update_emergency_contact(principal.id, body)
        .await?;
    Ok(Envelope::data(profile).message("Emergency contact updated successfully"))
}

async fn add_favorite_service(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<FavoriteServiceBody>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles
        .add_favorite_service(principal.id, &body.service_name)
        .await?;
    Ok(Envelope::data(profile).message("Favorite service added successfully"))
}

async fn remove_favorite_service(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
    Path(service_name): Path<String>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles
        .remove_favorite_service(principal.id, &service_name)
        .await?;
    Ok(Envelope::data(profile).message("Favorite service removed successfully"))
}

async fn deactivate(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.deactivate(principal.id).await?;
    Ok(Envelope::data(profile).message("Profile deactivated successfully"))
}

async fn reactivate(
    State(profiles): State<CustomerProfileService>,
    Extension(principal): Extension<Principal>,
) -> Result<Envelope<CustomerProfile>> {
    let profile = profiles.reactivate(principal.id).await?;
    Ok(Envelope::data(profile).message("Profile reactivated successfully"))
}
