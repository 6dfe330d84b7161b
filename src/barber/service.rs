use std::sync::Arc;

use axum::extract::FromRef;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::barber::{
    Availability, Barber, BarberFilter, BarberPatch, BarberProfile, BarberRepository,
};
use crate::error::{Result, ServerError};
use crate::salon::{ListingStatus, Salon, SalonService};

/// Number of barbers returned by `top_rated` when no limit is given.
pub const DEFAULT_TOP_RATED: usize = 10;
const MIN_QUERY_LENGTH: usize = 2;

const SALON_NOT_FOUND: &str = "Salon not found for this owner";
const NOT_YOURS: &str = "Barber not found or doesn't belong to your salon";

/// Staffing summary of a salon.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarberCount {
    pub salon_id: Uuid,
    pub salon_name: String,
    pub barber_count: u64,
    pub listing_status: ListingStatus,
}

/// Barber manager.
#[derive(Clone)]
pub struct BarberService {
    repo: Arc<dyn BarberRepository>,
    salons: SalonService,
}

impl FromRef<AppState> for BarberService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.db.barbers),
            SalonService::from_ref(state),
        )
    }
}

impl BarberService {
    /// Create a new [`BarberService`].
    pub fn new(repo: Arc<dyn BarberRepository>, salons: SalonService) -> Self {
        Self { repo, salons }
    }

    async fn salon_of(&self, owner_id: Uuid) -> Result<Salon> {
        self.salons
            .mine(owner_id)
            .await
            .map_err(|err| match err {
                ServerError::NotFound(_) => ServerError::NotFound(SALON_NOT_FOUND),
                err => err,
            })
    }

    /// Barber `id` if it works in the salon of `owner_id`.
    async fn owned(&self, owner_id: Uuid, id: Uuid) -> Result<Barber> {
        let salon = self.salon_of(owner_id).await?;

        self.repo
            .find_by_id(id)
            .await?
            .filter(|barber| barber.salon_id == salon.id)
            .ok_or(ServerError::NotFound(NOT_YOURS))
    }

    /// Recompute the listing status of a salon after its staff changed.
    async fn refresh_listing(&self, salon_id: Uuid) -> Result<ListingStatus> {
        let active = self.repo.count_active(salon_id).await?;
        let salon = self.salons.refresh_listing(salon_id, active).await?;

        Ok(salon.listing_status)
    }

    async fn set_active(&self, owner_id: Uuid, id: Uuid, is_active: bool) -> Result<Barber> {
        let mut barber = self.owned(owner_id, id).await?;
        barber.is_active = is_active;
        barber.updated_at = Utc::now();
        self.repo.update(&barber).await?;
        self.refresh_listing(barber.salon_id).await?;
        tracing::info!(
            barber_id = %id,
            salon_id = %barber.salon_id,
            is_active,
            "barber activation changed"
        );

        Ok(barber)
    }

    /// Hire a barber in the salon of `owner_id`.
    pub async fn create(&self, owner_id: Uuid, profile: BarberProfile) -> Result<Barber> {
        let salon = self.salon_of(owner_id).await?;

        let barber = Barber::new(salon.id, profile);
        self.repo.create(&barber).await?;
        self.refresh_listing(salon.id).await?;
        tracing::info!(barber_id = %barber.id, salon_id = %salon.id, "barber created");

        Ok(barber)
    }

    /// Active barbers of the salon of `owner_id`.
    pub async fn mine(&self, owner_id: Uuid) -> Result<Vec<Barber>> {
        let salon = self.salon_of(owner_id).await?;
        self.repo.list(BarberFilter::active(Some(salon.id))).await
    }

    pub async fn count(&self, owner_id: Uuid) -> Result<BarberCount> {
        let salon = self.salon_of(owner_id).await?;
        let barber_count = self.repo.count_active(salon.id).await?;

        Ok(BarberCount {
            salon_id: salon.id,
            salon_name: salon.salon_name,
            barber_count,
            listing_status: ListingStatus::from_active_barbers(barber_count),
        })
    }

    pub async fn update(&self, owner_id: Uuid, id: Uuid, patch: BarberPatch) -> Result<Barber> {
        let mut barber = self.owned(owner_id, id).await?;
        barber.apply(patch);
        self.repo.update(&barber).await?;

        Ok(barber)
    }

    pub async fn update_availability(
        &self,
        owner_id: Uuid,
        id: Uuid,
        availability: Vec<Availability>,
    ) -> Result<Barber> {
        let mut barber = self.owned(owner_id, id).await?;
        barber.availability = availability;
        barber.updated_at = Utc::now();
        self.repo.update(&barber).await?;

        Ok(barber)
    }

    /// Soft delete: the barber is only deactivated.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        self.set_active(owner_id, id, false).await.map(|_| ())
    }

    pub async fn activate(&self, owner_id: Uuid, id: Uuid) -> Result<Barber> {
        self.set_active(owner_id, id, true).await
    }

    pub async fn deactivate(&self, owner_id: Uuid, id: Uuid) -> Result<Barber> {
        self.set_active(owner_id, id, false).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Barber> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ServerError::NotFound("Barber not found"))
    }

    /// Active barbers, optionally restricted to one specialty.
    pub async fn active(&self, specialty: Option<&str>) -> Result<Vec<Barber>> {
        let barbers = self.repo.list(BarberFilter::active(None)).await?;

        Ok(match specialty.map(str::trim).filter(|s| !s.is_empty()) {
            Some(specialty) => {
                let specialty = specialty.to_lowercase();
                barbers
                    .into_iter()
                    .filter(|barber| barber.has_specialty(&specialty))
                    .collect()
            },
            None => barbers,
        })
    }

    /// Case-insensitive search over name, specialties and bio of active
    /// barbers.
    pub async fn search(&self, query: &str) -> Result<Vec<Barber>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LENGTH {
            return Err(ServerError::field(
                "q",
                "length",
                "Search query must be at least 2 characters long",
            ));
        }

        let barbers = self.repo.list(BarberFilter::active(None)).await?;
        Ok(barbers
            .into_iter()
            .filter(|barber| {
                barber.name.to_lowercase().contains(&query)
                    || barber.has_specialty(&query)
                    || barber
                        .bio
                        .as_deref()
                        .is_some_and(|bio| bio.to_lowercase().contains(&query))
            })
            .collect())
    }

    pub async fn by_specialty(&self, specialty: &str) -> Result<Vec<Barber>> {
        if specialty.trim().chars().count() < MIN_QUERY_LENGTH {
            return Err(ServerError::field(
                "specialty",
                "length",
                "Specialty must be at least 2 characters long",
            ));
        }

        self.active(Some(specialty)).await
    }

    /// Best rated active barbers: average first, then number of reviews.
    pub async fn top_rated(&self, limit: Option<usize>) -> Result<Vec<Barber>> {
        let mut barbers = self.repo.list(BarberFilter::active(None)).await?;
        barbers.sort_by(|a, b| {
            b.rating
                .average
                .total_cmp(&a.rating.average)
                .then(b.rating.count.cmp(&a.rating.count))
        });
        barbers.truncate(limit.unwrap_or(DEFAULT_TOP_RATED));

        Ok(barbers)
    }

    /// Active barbers of a salon.
    pub async fn by_salon(&self, salon_id: Uuid) -> Result<Vec<Barber>> {
        self.repo.list(BarberFilter::active(Some(salon_id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barber::MemoryBarberRepository;
    use crate::salon::{MemorySalonRepository, Rating};

    struct Fixture {
        barbers: BarberService,
        salons: SalonService,
        repo: Arc<MemoryBarberRepository>,
        owner: Uuid,
        salon: Salon,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryBarberRepository::default());
        let salons = SalonService::new(Arc::new(MemorySalonRepository::default()), repo.clone());
        let barbers = BarberService::new(repo.clone(), salons.clone());

        let owner = Uuid::new_v4();
        let salon = salons
            .create(
                owner,
                serde_json::from_value(serde_json::json!({
                    "salonName": "Fade Factory",
                    "address": "12 Main Street",
                    "phoneNumber": "555-0100"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        Fixture {
            barbers,
            salons,
            repo,
            owner,
            salon,
        }
    }

    fn profile(name: &str, specialties: &[&str]) -> BarberProfile {
        BarberProfile {
            name: name.into(),
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
            experience: None,
            profile_picture: None,
            phone_number: None,
            email: None,
            bio: None,
            availability: Vec::new(),
        }
    }

    async fn listing(f: &Fixture) -> ListingStatus {
        f.salons.get(f.salon.id).await.unwrap().listing_status
    }

    #[tokio::test]
    async fn test_listing_follows_active_barbers() {
        let f = fixture().await;
        assert_eq!(listing(&f).await, ListingStatus::NotListed);

        let sam = f.barbers.create(f.owner, profile("Sam", &[])).await.unwrap();
        assert_eq!(listing(&f).await, ListingStatus::Listed);

        let alex = f.barbers.create(f.owner, profile("Alex", &[])).await.unwrap();
        f.barbers.deactivate(f.owner, sam.id).await.unwrap();
        assert_eq!(listing(&f).await, ListingStatus::Listed);

        f.barbers.delete(f.owner, alex.id).await.unwrap();
        assert_eq!(listing(&f).await, ListingStatus::NotListed);
        // Soft delete keeps the record.
        assert!(!f.barbers.get(alex.id).await.unwrap().is_active);

        f.barbers.activate(f.owner, sam.id).await.unwrap();
        assert_eq!(listing(&f).await, ListingStatus::Listed);

        let count = f.barbers.count(f.owner).await.unwrap();
        assert_eq!(count.barber_count, 1);
        assert_eq!(count.salon_name, "Fade Factory");
        assert_eq!(count.listing_status, ListingStatus::Listed);
        assert_eq!(f.barbers.mine(f.owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ownership() {
        let f = fixture().await;
        let sam = f.barbers.create(f.owner, profile("Sam", &[])).await.unwrap();

        let stranger = Uuid::new_v4();
        match f.barbers.deactivate(stranger, sam.id).await {
            Err(ServerError::NotFound(message)) => assert_eq!(message, SALON_NOT_FOUND),
            other => panic!("unexpected {other:?}"),
        }

        // An owner with another salon.
        f.salons
            .create(
                stranger,
                serde_json::from_value(serde_json::json!({
                    "salonName": "Other Place",
                    "address": "99 Side Road",
                    "phoneNumber": "555-0199"
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        match f.barbers.update(stranger, sam.id, BarberPatch::default()).await {
            Err(ServerError::NotFound(message)) => assert_eq!(message, NOT_YOURS),
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.barbers.get(sam.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_public_queries() {
        let f = fixture().await;
        let sam = f
            .barbers
            .create(f.owner, profile("Sam", &["Fades", "Beard Styling"]))
            .await
            .unwrap();
        let alex = f
            .barbers
            .create(f.owner, profile("Alex", &["Coloring"]))
            .await
            .unwrap();
        let mut lee = f.barbers.create(f.owner, profile("Lee", &["fades"])).await.unwrap();
        f.barbers
            .update(f.owner, alex.id, BarberPatch {
                bio: Some("Expert in balayage".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(f.barbers.active(None).await.unwrap().len(), 3);
        assert_eq!(f.barbers.active(Some("FADE")).await.unwrap().len(), 2);
        assert_eq!(f.barbers.by_specialty("beard").await.unwrap()[0].id, sam.id);
        assert!(f.barbers.by_specialty("b").await.is_err());
        assert_eq!(f.barbers.search("balayage").await.unwrap()[0].id, alex.id);
        assert_eq!(f.barbers.search("sa").await.unwrap().len(), 1);
        assert!(f.barbers.search(" ").await.is_err());

        let mut rated = f.repo.find_by_id(sam.id).await.unwrap().unwrap();
        rated.rating = Rating {
            average: 4.5,
            count: 10,
        };
        f.repo.update(&rated).await.unwrap();
        lee.rating = Rating {
            average: 4.5,
            count: 20,
        };
        f.repo.update(&lee).await.unwrap();

        let top = f.barbers.top_rated(Some(2)).await.unwrap();
        let ids: Vec<Uuid> = top.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![lee.id, sam.id]);
        assert_eq!(f.barbers.top_rated(None).await.unwrap().len(), 3);

        f.barbers.deactivate(f.owner, lee.id).await.unwrap();
        assert_eq!(f.barbers.by_salon(f.salon.id).await.unwrap().len(), 2);
        assert!(f.barbers.by_salon(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_without_salon() {
        let f = fixture().await;

        assert!(matches!(
            f.barbers.create(Uuid::new_v4(), profile("Sam", &[])).await,
            Err(ServerError::NotFound(SALON_NOT_FOUND))
        ));
        assert!(matches!(
            f.barbers.get(Uuid::new_v4()).await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_salon_deletion_removes_barbers() {
        let f = fixture().await;
        let sam = f.barbers.create(f.owner, profile("Sam", &["Fades"])).await.unwrap();
        let other = Uuid::new_v4();
        f.salons
            .create(
                other,
                serde_json::from_value(serde_json::json!({
                    "salonName": "Other Cuts",
                    "address": "34 High Street",
                    "phoneNumber": "555-0101"
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        let alex = f.barbers.create(other, profile("Alex", &["Fades"])).await.unwrap();

        f.salons.delete_mine(f.owner).await.unwrap();

        assert!(matches!(
            f.barbers.get(sam.id).await,
            Err(ServerError::NotFound(_))
        ));
        let active: Vec<Uuid> = f
            .barbers
            .active(None)
            .await
            .unwrap()
            .iter()
            .map(|barber| barber.id)
            .collect();
        assert_eq!(active, vec![alex.id]);
        assert_eq!(f.barbers.top_rated(None).await.unwrap().len(), 1);
        assert!(f.repo.find_by_id(alex.id).await.unwrap().is_some());
    }
}
