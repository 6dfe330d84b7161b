//! Salon profiles managed by their owner.

pub mod listing;
mod repository;
mod service;

pub use listing::ListingStatus;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::account::ApprovalStatus;

/// Salon as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salon {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub salon_name: String,
    pub address: String,
    pub phone_number: String,
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    pub salon_images: Vec<String>,
    #[serde(rename = "services")]
    pub offerings: Vec<Offering>,
    pub operating_hours: Vec<OperatingHours>,
    pub amenities: Vec<String>,
    pub ratings: Rating,
    pub status: ApprovalStatus,
    pub listing_status: ListingStatus,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Salon {
    /// Create a pending, unlisted salon for `owner_id`.
    pub fn new(owner_id: Uuid, profile: SalonProfile) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            owner_id,
            salon_name: profile.salon_name.trim().to_owned(),
            address: profile.address.trim().to_owned(),
            phone_number: profile.phone_number,
            description: profile.description,
            profile_picture: profile.profile_picture,
            salon_images: profile.salon_images,
            offerings: profile.offerings,
            operating_hours: profile.operating_hours,
            amenities: profile.amenities,
            ratings: Rating::default(),
            status: ApprovalStatus::default(),
            listing_status: ListingStatus::default(),
            location: profile.location.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: SalonPatch) {
        if let Some(salon_name) = patch.salon_name {
            self.salon_name = salon_name.trim().to_owned();
        }
        if let Some(address) = patch.address {
            self.address = address.trim().to_owned();
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.profile_picture.is_some() {
            self.profile_picture = patch.profile_picture;
        }
        if let Some(salon_images) = patch.salon_images {
            self.salon_images = salon_images;
        }
        if let Some(offerings) = patch.offerings {
            self.offerings = offerings;
        }
        if let Some(operating_hours) = patch.operating_hours {
            self.operating_hours = operating_hours;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = amenities;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }
}

/// A service offered by a salon, priced per visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Offering {
    #[validate(length(min = 2, message = "Service name must be at least 2 characters long."))]
    pub name: String,
    #[validate(range(exclusive_min = 0.0, message = "Price must be a positive number."))]
    pub price: f64,
    /// Minutes.
    #[validate(range(min = 1, message = "Duration must be a positive number."))]
    pub duration: i32,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Opening slot of a salon for one day of the week.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OperatingHours {
    pub day: Weekday,
    #[validate(length(min = 1, message = "Open time is required."))]
    pub open_time: String,
    #[validate(length(min = 1, message = "Close time is required."))]
    pub close_time: String,
    #[serde(default)]
    pub is_closed: bool,
}

/// Aggregated review score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
}

/// GeoJSON point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[serde(default = "point")]
    pub r#type: String,
    /// `[longitude, latitude]`.
    #[validate(custom(function = "validate_coordinates"))]
    pub coordinates: [f64; 2],
}

fn point() -> String {
    "Point".to_owned()
}

impl Default for Location {
    fn default() -> Self {
        Self::point(0.0, 0.0)
    }
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            r#type: point(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

fn validate_coordinates(coordinates: &[f64; 2]) -> Result<(), ValidationError> {
    let [longitude, latitude] = *coordinates;
    if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::new("coordinates")
            .with_message("Location coordinates must be [longitude, latitude].".into()));
    }

    Ok(())
}

/// Body of a salon creation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SalonProfile {
    #[validate(length(min = 2, message = "Salon name must be at least 2 characters long."))]
    pub salon_name: String,
    #[validate(length(min = 5, message = "Address must be at least 5 characters long."))]
    pub address: String,
    #[validate(length(min = 1, message = "Phone number is required."))]
    pub phone_number: String,
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub salon_images: Vec<String>,
    #[serde(default, rename = "services")]
    #[validate(nested)]
    pub offerings: Vec<Offering>,
    #[serde(default)]
    #[validate(nested)]
    pub operating_hours: Vec<OperatingHours>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[validate(nested)]
    pub location: Option<Location>,
}

/// Partial update of a salon.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SalonPatch {
    #[validate(length(min = 2, message = "Salon name must be at least 2 characters long."))]
    pub salon_name: Option<String>,
    #[validate(length(min = 5, message = "Address must be at least 5 characters long."))]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Phone number is required."))]
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    pub salon_images: Option<Vec<String>>,
    #[serde(rename = "services")]
    #[validate(nested)]
    pub offerings: Option<Vec<Offering>>,
    #[validate(nested)]
    pub operating_hours: Option<Vec<OperatingHours>>,
    pub amenities: Option<Vec<String>>,
    #[validate(nested)]
    pub location: Option<Location>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SalonProfile {
        serde_json::from_value(serde_json::json!({
            "salonName": "Fade Factory",
            "address": "12 Main Street",
            "phoneNumber": "555-0100",
            "services": [{ "name": "Haircut", "price": 25.0, "duration": 30 }],
            "operatingHours": [{ "day": "Monday", "openTime": "09:00", "closeTime": "18:00" }]
        }))
        .unwrap()
    }

    #[test]
    fn test_new_salon_defaults() {
        let owner = Uuid::new_v4();
        let salon = Salon::new(owner, profile());

        assert_eq!(salon.owner_id, owner);
        assert_eq!(salon.status, ApprovalStatus::Pending);
        assert_eq!(salon.listing_status, ListingStatus::NotListed);
        assert_eq!(salon.location, Location::point(0.0, 0.0));
        assert!(!salon.operating_hours[0].is_closed);
    }

    #[test]
    fn test_validation() {
        assert!(profile().validate().is_ok());

        let mut invalid = profile();
        invalid.salon_name = "F".into();
        invalid.offerings[0].price = 0.0;
        invalid.offerings[0].duration = -5;
        let errors = invalid.validate().unwrap_err();
        // Name and the nested service list.
        assert_eq!(errors.errors().len(), 2);

        let mut far = profile();
        far.location = Some(Location::point(200.0, 10.0));
        assert!(far.validate().is_err());
    }

    #[test]
    fn test_wire_format() {
        let salon = Salon::new(Uuid::new_v4(), profile());
        let json = serde_json::to_value(&salon).unwrap();

        assert_eq!(json["services"][0]["name"], "Haircut");
        assert_eq!(json["listingStatus"], "notListed");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["location"]["type"], "Point");
        assert_eq!(json["operatingHours"][0]["day"], "Monday");
    }

    #[test]
    fn test_patch_keeps_untouched_fields() {
        let mut salon = Salon::new(Uuid::new_v4(), profile());
        salon.apply(SalonPatch {
            description: Some("Classic cuts".into()),
            ..Default::default()
        });

        assert_eq!(salon.salon_name, "Fade Factory");
        assert_eq!(salon.description.as_deref(), Some("Classic cuts"));
        assert_eq!(salon.offerings.len(), 1);
    }
}
