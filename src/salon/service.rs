use std::sync::Arc;

use axum::extract::FromRef;
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use crate::account::ApprovalStatus;
use crate::barber::BarberRepository;
use crate::error::{Result, ServerError};
use crate::salon::{
    ListingStatus, Location, Offering, Salon, SalonFilter, SalonPatch, SalonProfile,
    SalonRepository,
};

/// Radius used by `nearby` when none is given, in metres.
pub const DEFAULT_MAX_DISTANCE: f64 = 5000.0;
/// Shortest accepted search term.
pub const MIN_QUERY_LENGTH: usize = 2;
const EARTH_RADIUS: f64 = 6_371_008.8;

const SALON_NOT_FOUND: &str = "Salon not found";
const SERVICE_NOT_FOUND: &str = "Service not found";

/// Salon manager.
#[derive(Clone)]
pub struct SalonService {
    repo: Arc<dyn SalonRepository>,
    barbers: Arc<dyn BarberRepository>,
}

impl FromRef<AppState> for SalonService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.db.salons), Arc::clone(&state.db.barbers))
    }
}

impl SalonService {
    /// Create a new [`SalonService`].
    pub fn new(repo: Arc<dyn SalonRepository>, barbers: Arc<dyn BarberRepository>) -> Self {
        Self { repo, barbers }
    }

    /// Open the salon of an owner. Owners have at most one salon.
    pub async fn create(&self, owner_id: Uuid, profile: SalonProfile) -> Result<Salon> {
        if self.repo.find_by_owner(owner_id).await?.is_some() {
            return Err(ServerError::Conflict("Owner already has a salon profile"));
        }

        let salon = Salon::new(owner_id, profile);
        self.repo.create(&salon).await?;
        tracing::info!(salon_id = %salon.id, %owner_id, "salon created");

        Ok(salon)
    }

    /// Salon of an owner.
    pub async fn mine(&self, owner_id: Uuid) -> Result<Salon> {
        self.repo
            .find_by_owner(owner_id)
            .await?
            .ok_or(ServerError::NotFound(SALON_NOT_FOUND))
    }

    pub async fn update_mine(&self, owner_id: Uuid, patch: SalonPatch) -> Result<Salon> {
        let mut salon = self.mine(owner_id).await?;
        salon.apply(patch);
        self.repo.update(&salon).await?;

        Ok(salon)
    }

    /// Delete the salon of an owner along with its barbers.
    pub async fn delete_mine(&self, owner_id: Uuid) -> Result<()> {
        let salon = self.mine(owner_id).await?;
        let barbers = self.barbers.delete_by_salon(salon.id).await?;
        if !self.repo.delete(salon.id).await? {
            return Err(ServerError::NotFound(SALON_NOT_FOUND));
        }
        tracing::info!(salon_id = %salon.id, %owner_id, barbers, "salon deleted");

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Salon> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ServerError::NotFound(SALON_NOT_FOUND))
    }

    /// Every salon, optionally restricted to one approval status.
    pub async fn list(&self, status: Option<ApprovalStatus>) -> Result<Vec<Salon>> {
        self.repo
            .list(SalonFilter {
                status,
                ..Default::default()
            })
            .await
    }

    pub async fn approved(&self) -> Result<Vec<Salon>> {
        self.list(Some(ApprovalStatus::Approved)).await
    }

    /// Approved and listed salons.
    pub async fn listed(&self) -> Result<Vec<Salon>> {
        self.repo.list(SalonFilter::public()).await
    }

    /// Listed salons, whatever their approval status.
    pub async fn all_listed(&self) -> Result<Vec<Salon>> {
        self.repo
            .list(SalonFilter {
                listing_status: Some(ListingStatus::Listed),
                ..Default::default()
            })
            .await
    }

    /// Case-insensitive search over name, address and description of
    /// public salons.
    pub async fn search(&self, query: &str) -> Result<Vec<Salon>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LENGTH {
            return Err(ServerError::field(
                "q",
                "length",
                "Search query must be at least 2 characters long",
            ));
        }

        let salons = self.listed().await?;
        Ok(salons
            .into_iter()
            .filter(|salon| {
                [
                    Some(salon.salon_name.as_str()),
                    Some(salon.address.as_str()),
                    salon.description.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&query))
            })
            .collect())
    }

    /// Public salons within `max_distance` metres, nearest first.
    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance: Option<f64>,
    ) -> Result<Vec<Salon>> {
        let origin = Location::point(longitude, latitude);
        let max_distance = max_distance.unwrap_or(DEFAULT_MAX_DISTANCE);

        let mut salons: Vec<(f64, Salon)> = self
            .listed()
            .await?
            .into_iter()
            .map(|salon| (distance(&origin, &salon.location), salon))
            .filter(|(distance, _)| *distance <= max_distance)
            .collect();
        salons.sort_by(|(a, _), (b, _)| a.total_cmp(b));

        Ok(salons.into_iter().map(|(_, salon)| salon).collect())
    }

    /// Moderate a salon.
    pub async fn update_status(&self, id: Uuid, status: ApprovalStatus) -> Result<Salon> {
        let mut salon = self.get(id).await?;
        salon.status = status;
        salon.updated_at = Utc::now();
        self.repo.update(&salon).await?;
        tracing::info!(salon_id = %id, %status, "salon status updated");

        Ok(salon)
    }

    pub async fn add_offering(&self, owner_id: Uuid, offering: Offering) -> Result<Salon> {
        let mut salon = self.mine(owner_id).await?;
        salon.offerings.push(offering);
        salon.updated_at = Utc::now();
        self.repo.update(&salon).await?;

        Ok(salon)
    }

    /// Replace the offering at `index`. A missing description keeps the
    /// previous one.
    pub async fn update_offering(
        &self,
        owner_id: Uuid,
        index: usize,
        offering: Offering,
    ) -> Result<Salon> {
        let mut salon = self.mine(owner_id).await?;
        let current = salon
            .offerings
            .get_mut(index)
            .ok_or(ServerError::NotFound(SERVICE_NOT_FOUND))?;

        let description = offering.description.or_else(|| current.description.take());
        *current = Offering {
            description,
            ..offering
        };
        salon.updated_at = Utc::now();
        self.repo.update(&salon).await?;

        Ok(salon)
    }

    pub async fn remove_offering(&self, owner_id: Uuid, index: usize) -> Result<Salon> {
        let mut salon = self.mine(owner_id).await?;
        if index >= salon.offerings.len() {
            return Err(ServerError::NotFound(SERVICE_NOT_FOUND));
        }

        salon.offerings.remove(index);
        salon.updated_at = Utc::now();
        self.repo.update(&salon).await?;

        Ok(salon)
    }

    /// Recompute the listing status of a salon from its active barber count
    /// and persist it.
    pub async fn refresh_listing(&self, salon_id: Uuid, active_barbers: u64) -> Result<Salon> {
        let mut salon = self.get(salon_id).await?;
        let listing_status = ListingStatus::from_active_barbers(active_barbers);

        if salon.listing_status != listing_status {
            tracing::info!(
                %salon_id,
                active_barbers,
                from = %salon.listing_status,
                to = %listing_status,
                "salon listing status changed"
            );
            metrics::counter!("salon_listing_changes_total", "to" => listing_status.as_str())
                .increment(1);
        }
        salon.listing_status = listing_status;
        salon.updated_at = Utc::now();
        self.repo.update(&salon).await?;

        Ok(salon)
    }
}

/// Great-circle distance between two points, in metres.
pub fn distance(a: &Location, b: &Location) -> f64 {
    let (lat1, lat2) = (a.latitude().to_radians(), b.latitude().to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}
