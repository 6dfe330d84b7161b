//! Customer profiles, booking history and loyalty.

pub mod loyalty;
mod repository;
mod service;

pub use loyalty::{MembershipTier, PointsAction};
pub use repository::*;
pub use service::*;

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static ZIP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("ZIP code pattern compiles"));

/// Customer profile as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profile_picture: Option<String>,
    pub address: Address,
    pub preferences: Preferences,
    pub booking_history: Vec<Booking>,
    /// May go negative: deductions are not floored.
    pub loyalty_points: i64,
    pub membership_tier: MembershipTier,
    pub emergency_contact: EmergencyContact,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerProfile {
    /// Create an active bronze profile for `customer_id`.
    pub fn new(customer_id: Uuid, form: CustomerProfileForm) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            customer_id,
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            phone_number: form.phone_number,
            date_of_birth: form.date_of_birth,
            gender: form.gender,
            profile_picture: form.profile_picture,
            address: form.address.unwrap_or_default(),
            preferences: form.preferences.unwrap_or_default(),
            booking_history: Vec::new(),
            loyalty_points: 0,
            membership_tier: MembershipTier::default(),
            emergency_contact: form.emergency_contact.unwrap_or_default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the point balance by `delta` and re-derive the tier.
    pub fn adjust_points(&mut self, delta: i64) {
        let (points, tier) = loyalty::apply(self.loyalty_points, delta);
        if tier != self.membership_tier {
            tracing::info!(
                profile_id = %self.id,
                from = %self.membership_tier,
                to = %tier,
                "membership tier changed"
            );
            metrics::counter!("loyalty_tier_changes_total", "to" => tier.as_str()).increment(1);
        }

        self.loyalty_points = points;
        self.membership_tier = tier;
        self.updated_at = Utc::now();
    }

    /// Apply a partial update. Loyalty fields are not part of it.
    pub fn apply(&mut self, patch: CustomerProfilePatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name.trim().to_owned();
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name.trim().to_owned();
        }
        if patch.phone_number.is_some() {
            self.phone_number = patch.phone_number;
        }
        if patch.date_of_birth.is_some() {
            self.date_of_birth = patch.date_of_birth;
        }
        if patch.gender.is_some() {
            self.gender = patch.gender;
        }
        if patch.profile_picture.is_some() {
            self.profile_picture = patch.profile_picture;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(preferences) = patch.preferences {
            self.preferences = preferences;
        }
        if let Some(emergency_contact) = patch.emergency_contact {
            self.emergency_contact = emergency_contact;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive match of `needle` (already lowercase) against names,
    /// phone number and city.
    pub fn matches(&self, needle: &str) -> bool {
        [
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.phone_number.as_deref(),
            self.address.city.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(custom(function = "validate_zip_code"))]
    pub zip_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_owned()
}

impl Default for Address {
    fn default() -> Self {
        Self {
            street: None,
            city: None,
            state: None,
            zip_code: None,
            country: default_country(),
        }
    }
}

fn validate_zip_code(zip_code: &str) -> Result<(), ValidationError> {
    if !ZIP_CODE.is_match(zip_code) {
        return Err(ValidationError::new("zip_code")
            .with_message("ZIP code must be in format 12345 or 12345-6789.".into()));
    }

    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub favorite_services: Vec<String>,
    pub preferred_salons: Vec<Uuid>,
    pub notifications: Notifications,
    pub hair_type: Option<String>,
    pub skin_type: Option<String>,
}

/// Channels a customer accepts notifications on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
        }
    }
}

/// Partial update of notification preferences.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct NotificationsPatch {
    pub email: Option<bool>,
    pub sms: Option<bool>,
    pub push: Option<bool>,
}

impl Notifications {
    pub fn apply(&mut self, patch: NotificationsPatch) {
        self.email = patch.email.unwrap_or(self.email);
        self.sms = patch.sms.unwrap_or(self.sms);
        self.push = patch.push.unwrap_or(self.push);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Completed,
    Cancelled,
    NoShow,
}

/// Past appointment of a customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub salon_id: Uuid,
    #[validate(length(min = 1, message = "Service ID is required."))]
    pub service_id: String,
    pub date: DateTime<Utc>,
    pub status: BookingStatus,
    #[validate(range(min = 1, max = 5, message = "Rating must be a number between 1 and 5."))]
    pub rating: Option<u8>,
    pub review: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub relationship: Option<String>,
}

/// Body of a profile creation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfileForm {
    #[validate(length(min = 2, message = "First name must be at least 2 characters long."))]
    pub first_name: String,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters long."))]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profile_picture: Option<String>,
    #[validate(nested)]
    pub address: Option<Address>,
    pub preferences: Option<Preferences>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Partial update of a profile.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfilePatch {
    #[validate(length(min = 2, message = "First name must be at least 2 characters long."))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters long."))]
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profile_picture: Option<String>,
    #[validate(nested)]
    pub address: Option<Address>,
    pub preferences: Option<Preferences>,
    pub emergency_contact: Option<EmergencyContact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CustomerProfileForm {
        serde_json::from_value(serde_json::json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "gender": "prefer_not_to_say",
            "address": { "city": "Springfield", "zipCode": "12345-6789" }
        }))
        .unwrap()
    }

    #[test]
    fn test_new_profile_defaults() {
        let profile = CustomerProfile::new(Uuid::new_v4(), form());

        assert_eq!(profile.loyalty_points, 0);
        assert_eq!(profile.membership_tier, MembershipTier::Bronze);
        assert!(profile.is_active);
        assert_eq!(profile.address.country, "US");
        assert_eq!(profile.preferences.notifications, Notifications {
            email: true,
            sms: false,
            push: true,
        });
        assert_eq!(profile.gender, Some(Gender::PreferNotToSay));
    }

    #[test]
    fn test_validation() {
        assert!(form().validate().is_ok());

        let mut invalid = form();
        invalid.first_name = "J".into();
        invalid.address = Some(Address {
            zip_code: Some("1234".into()),
            ..Default::default()
        });
        assert_eq!(invalid.validate().unwrap_err().errors().len(), 2);

        let booking: Booking = serde_json::from_value(serde_json::json!({
            "salonId": Uuid::new_v4(),
            "serviceId": "haircut",
            "date": "2024-05-01T10:00:00Z",
            "status": "no_show",
            "rating": 6
        }))
        .unwrap();
        assert!(booking.validate().is_err());
    }

    #[test]
    fn test_adjust_points() {
        let mut profile = CustomerProfile::new(Uuid::new_v4(), form());

        profile.adjust_points(2_000);
        assert_eq!(profile.membership_tier, MembershipTier::Gold);
        profile.adjust_points(-2_100);
        assert_eq!(profile.loyalty_points, -100);
        assert_eq!(profile.membership_tier, MembershipTier::Bronze);
    }

    #[test]
    fn test_matches() {
        let profile = CustomerProfile::new(Uuid::new_v4(), form());

        assert!(profile.matches("spring"));
        assert!(profile.matches("doe"));
        assert!(!profile.matches("paris"));
    }

    #[test]
    fn test_notifications_patch() {
        let mut notifications = Notifications::default();
        notifications.apply(NotificationsPatch {
            sms: Some(true),
            ..Default::default()
        });

        assert!(notifications.email && notifications.sms && notifications.push);
    }
}
