use std::sync::Arc;

use axum::extract::FromRef;
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use crate::customer::loyalty::COMPLETED_BOOKING_POINTS;
use crate::customer::{
    Booking, BookingStatus, CustomerFilter, CustomerProfile, CustomerProfileForm,
    CustomerProfilePatch, CustomerProfileRepository, EmergencyContact, MembershipTier,
    NotificationsPatch, PointsAction,
};
use crate::error::{Result, ServerError};

/// Number of profiles returned by `top_loyalty` when no limit is given.
pub const DEFAULT_TOP_LOYALTY: usize = 10;
const MIN_QUERY_LENGTH: usize = 2;

const PROFILE_NOT_FOUND: &str = "Customer profile not found";

/// Customer profile manager.
#[derive(Clone)]
pub struct CustomerProfileService {
    repo: Arc<dyn CustomerProfileRepository>,
}

impl FromRef<AppState> for CustomerProfileService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.db.profiles))
    }
}

impl CustomerProfileService {
    /// Create a new [`CustomerProfileService`].
    pub fn new(repo: Arc<dyn CustomerProfileRepository>) -> Self {
        Self { repo }
    }

    /// Create the profile of `customer_id`. A customer has at most one.
    pub async fn create(
        &self,
        customer_id: Uuid,
        form: CustomerProfileForm,
    ) -> Result<CustomerProfile> {
        if self.repo.find_by_customer(customer_id).await?.is_some() {
            return Err(ServerError::Conflict("Customer already has a profile"));
        }

        let profile = CustomerProfile::new(customer_id, form);
        self.repo.create(&profile).await?;
        tracing::info!(profile_id = %profile.id, %customer_id, "customer profile created");

        Ok(profile)
    }

    /// Profile of a customer account.
    pub async fn mine(&self, customer_id: Uuid) -> Result<CustomerProfile> {
        self.repo
            .find_by_customer(customer_id)
            .await?
            .ok_or(ServerError::NotFound(PROFILE_NOT_FOUND))
    }

    pub async fn update_mine(
        &self,
        customer_id: Uuid,
        patch: CustomerProfilePatch,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| profile.apply(patch)).await
    }

    pub async fn delete_mine(&self, customer_id: Uuid) -> Result<()> {
        let profile = self.mine(customer_id).await?;
        if !self.repo.delete(profile.id).await? {
            return Err(ServerError::NotFound(PROFILE_NOT_FOUND));
        }
        tracing::info!(profile_id = %profile.id, %customer_id, "customer profile deleted");

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<CustomerProfile> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ServerError::NotFound(PROFILE_NOT_FOUND))
    }

    pub async fn list(&self, filter: CustomerFilter) -> Result<Vec<CustomerProfile>> {
        self.repo.list(filter).await
    }

    pub async fn active(&self) -> Result<Vec<CustomerProfile>> {
        self.repo.list(CustomerFilter::active()).await
    }

    /// Case-insensitive search over names, phone number and city of active
    /// profiles.
    pub async fn search(&self, query: &str) -> Result<Vec<CustomerProfile>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LENGTH {
            return Err(ServerError::field(
                "q",
                "length",
                "Search query must be at least 2 characters long",
            ));
        }

        let profiles = self.active().await?;
        Ok(profiles
            .into_iter()
            .filter(|profile| profile.matches(&query))
            .collect())
    }

    /// Active profiles of one tier, richest first.
    pub async fn by_tier(&self, tier: MembershipTier) -> Result<Vec<CustomerProfile>> {
        let mut profiles = self
            .repo
            .list(CustomerFilter {
                membership_tier: Some(tier),
                is_active: Some(true),
            })
            .await?;
        profiles.sort_by(|a, b| b.loyalty_points.cmp(&a.loyalty_points));

        Ok(profiles)
    }

    /// Active profiles with the highest point balance.
    pub async fn top_loyalty(&self, limit: Option<usize>) -> Result<Vec<CustomerProfile>> {
        let mut profiles = self.active().await?;
        profiles.sort_by(|a, b| b.loyalty_points.cmp(&a.loyalty_points));
        profiles.truncate(limit.unwrap_or(DEFAULT_TOP_LOYALTY));

        Ok(profiles)
    }

    /// Add or deduct loyalty points on the profile of `customer_id`.
    pub async fn adjust_points(
        &self,
        customer_id: Uuid,
        points: i64,
        action: PointsAction,
    ) -> Result<CustomerProfile> {
        if points <= 0 {
            return Err(ServerError::field(
                "points",
                "range",
                "Points must be a positive number",
            ));
        }

        let profile = self
            .modify(customer_id, |profile| profile.adjust_points(action.delta(points)))
            .await?;
        if profile.loyalty_points < 0 {
            tracing::warn!(
                profile_id = %profile.id,
                balance = profile.loyalty_points,
                "loyalty balance is negative"
            );
        }

        Ok(profile)
    }

    /// Record a past appointment. Completed ones earn loyalty points.
    pub async fn add_booking(
        &self,
        customer_id: Uuid,
        booking: Booking,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| {
            let completed = booking.status == BookingStatus::Completed;
            profile.booking_history.push(booking);
            if completed {
                profile.adjust_points(COMPLETED_BOOKING_POINTS);
            }
        })
        .await
    }

    pub async fn add_preferred_salon(
        &self,
        customer_id: Uuid,
        salon_id: Uuid,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| {
            let salons = &mut profile.preferences.preferred_salons;
            if !salons.contains(&salon_id) {
                salons.push(salon_id);
            }
        })
        .await
    }

    pub async fn remove_preferred_salon(
        &self,
        customer_id: Uuid,
        salon_id: Uuid,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| {
            profile
                .preferences
                .preferred_salons
                .retain(|id| *id != salon_id);
        })
        .await
    }

    pub async fn add_favorite_service(
        &self,
        customer_id: Uuid,
        service: &str,
    ) -> Result<CustomerProfile> {
        let service = service.trim();
        if service.chars().count() < MIN_QUERY_LENGTH {
            return Err(ServerError::field(
                "serviceName",
                "length",
                "Service name must be at least 2 characters long",
            ));
        }

        self.modify(customer_id, |profile| {
            let services = &mut profile.preferences.favorite_services;
            if !services.iter().any(|s| s == service) {
                services.push(service.to_owned());
            }
        })
        .await
    }

    pub async fn remove_favorite_service(
        &self,
        customer_id: Uuid,
        service: &str,
    ) -> Result<CustomerProfile> {
        let service = service.trim();
        self.modify(customer_id, |profile| {
            profile
                .preferences
                .favorite_services
                .retain(|s| s != service);
        })
        .await
    }

    pub async fn update_notifications(
        &self,
        customer_id: Uuid,
        patch: NotificationsPatch,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| {
            profile.preferences.notifications.apply(patch)
        })
        .await
    }

    pub async fn update_emergency_contact(
        &self,
        customer_id: Uuid,
        contact: EmergencyContact,
    ) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| profile.emergency_contact = contact)
            .await
    }

    pub async fn deactivate(&self, customer_id: Uuid) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| profile.is_active = false)
            .await
    }

    pub async fn reactivate(&self, customer_id: Uuid) -> Result<CustomerProfile> {
        self.modify(customer_id, |profile| profile.is_active = true)
            .await
    }

    /// Load the profile of `customer_id`, change it and save it back.
    async fn modify<F>(&self, customer_id: Uuid, change: F) -> Result<CustomerProfile>
    where
        F: FnOnce(&mut CustomerProfile),
    {
        let mut profile = self.mine(customer_id).await?;
        change(&mut profile);
        profile.updated_at = Utc::now();
        self.repo.update(&profile).await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::MemoryCustomerProfileRepository;

    fn service() -> CustomerProfileService {
        CustomerProfileService::new(Arc::new(MemoryCustomerProfileRepository::default()))
    }

    fn form(first_name: &str, city: &str) -> CustomerProfileForm {
        serde_json::from_value(serde_json::json!({
            "firstName": first_name,
            "lastName": "Doe",
            "address": { "city": city }
        }))
        .unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            salon_id: Uuid::new_v4(),
            service_id: "haircut".into(),
            date: Utc::now(),
            status,
            rating: Some(5),
            review: None,
        }
    }

    #[tokio::test]
    async fn test_one_profile_per_customer() {
        let service = service();
        let customer = Uuid::new_v4();

        let profile = service.create(customer, form("Jane", "Springfield")).await.unwrap();
        assert!(matches!(
            service.create(customer, form("Jane", "Springfield")).await,
            Err(ServerError::Conflict(_))
        ));
        assert_eq!(service.mine(customer).await.unwrap().id, profile.id);
        assert_eq!(service.get(profile.id).await.unwrap().customer_id, customer);

        service.delete_mine(customer).await.unwrap();
        assert!(matches!(
            service.mine(customer).await,
            Err(ServerError::NotFound(_))
        ));
        assert!(service.delete_mine(customer).await.is_err());
    }

    #[tokio::test]
    async fn test_points_drive_tier() {
        let service = service();
        let customer = Uuid::new_v4();
        service.create(customer, form("Jane", "Springfield")).await.unwrap();

        let profile = service
            .adjust_points(customer, 500, PointsAction::Add)
            .await
            .unwrap();
        assert_eq!(profile.membership_tier, MembershipTier::Silver);

        let profile = service
            .adjust_points(customer, 4_500, PointsAction::Add)
            .await
            .unwrap();
        assert_eq!(profile.loyalty_points, 5_000);
        assert_eq!(profile.membership_tier, MembershipTier::Platinum);

        let profile = service
            .adjust_points(customer, 6_000, PointsAction::Deduct)
            .await
            .unwrap();
        assert_eq!(profile.loyalty_points, -1_000);
        assert_eq!(profile.membership_tier, MembershipTier::Bronze);

        assert!(matches!(
            service.adjust_points(customer, 0, PointsAction::Add).await,
            Err(ServerError::Validation(_))
        ));
        assert!(matches!(
            service
                .adjust_points(Uuid::new_v4(), 10, PointsAction::Add)
                .await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_completed_booking_earns_points() {
        let service = service();
        let customer = Uuid::new_v4();
        service.create(customer, form("Jane", "Springfield")).await.unwrap();

        service
            .add_booking(customer, booking(BookingStatus::Cancelled))
            .await
            .unwrap();
        let profile = service
            .add_booking(customer, booking(BookingStatus::Completed))
            .await
            .unwrap();

        assert_eq!(profile.booking_history.len(), 2);
        assert_eq!(profile.loyalty_points, COMPLETED_BOOKING_POINTS);
    }

    #[tokio::test]
    async fn test_preferences_are_sets() {
        let service = service();
        let customer = Uuid::new_v4();
        service.create(customer, form("Jane", "Springfield")).await.unwrap();
        let salon = Uuid::new_v4();

        service.add_preferred_salon(customer, salon).await.unwrap();
        let profile = service.add_preferred_salon(customer, salon).await.unwrap();
        assert_eq!(profile.preferences.preferred_salons, vec![salon]);
        let profile = service.remove_preferred_salon(customer, salon).await.unwrap();
        assert!(profile.preferences.preferred_salons.is_empty());

        service.add_favorite_service(customer, "Fade").await.unwrap();
        let profile = service.add_favorite_service(customer, " Fade ").await.unwrap();
        assert_eq!(profile.preferences.favorite_services, vec!["Fade".to_owned()]);
        assert!(service.add_favorite_service(customer, "F").await.is_err());
        let profile = service.remove_favorite_service(customer, "Fade").await.unwrap();
        assert!(profile.preferences.favorite_services.is_empty());

        let profile = service
            .update_notifications(customer, NotificationsPatch {
                push: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(profile.preferences.notifications.email);
        assert!(!profile.preferences.notifications.push);
    }

    #[tokio::test]
    async fn test_listings() {
        let service = service();
        let jane = Uuid::new_v4();
        let john = Uuid::new_v4();
        let max = Uuid::new_v4();
        service.create(jane, form("Jane", "Springfield")).await.unwrap();
        service.create(john, form("John", "Shelbyville")).await.unwrap();
        service.create(max, form("Max", "Springfield")).await.unwrap();

        service.adjust_points(jane, 700, PointsAction::Add).await.unwrap();
        service.adjust_points(john, 900, PointsAction::Add).await.unwrap();
        service.adjust_points(max, 100, PointsAction::Add).await.unwrap();
        service.deactivate(max).await.unwrap();

        assert_eq!(service.active().await.unwrap().len(), 2);
        assert_eq!(service.list(CustomerFilter::default()).await.unwrap().len(), 3);
        assert_eq!(service.search("SPRING").await.unwrap().len(), 1);
        assert!(service.search("s").await.is_err());

        let silver = service.by_tier(MembershipTier::Silver).await.unwrap();
        let names: Vec<&str> = silver.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, vec!["John", "Jane"]);

        let top = service.top_loyalty(Some(1)).await.unwrap();
        assert_eq!(top[0].customer_id, john);

        service.reactivate(max).await.unwrap();
        assert_eq!(service.active().await.unwrap().len(), 3);
    }
}
