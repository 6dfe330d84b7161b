//! Barbers working in a salon.

mod repository;
mod service;

pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::salon::{Rating, Weekday};

/// Barber as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barber {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub name: String,
    pub specialties: Vec<String>,
    /// Years.
    pub experience: i32,
    pub profile_picture: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub rating: Rating,
    pub availability: Vec<Availability>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Barber {
    /// Create an active barber attached to `salon_id`.
    pub fn new(salon_id: Uuid, profile: BarberProfile) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            salon_id,
            name: profile.name.trim().to_owned(),
            specialties: profile.specialties,
            experience: profile.experience.unwrap_or_default(),
            profile_picture: profile.profile_picture,
            phone_number: profile.phone_number,
            email: profile.email,
            bio: profile.bio,
            rating: Rating::default(),
            availability: profile.availability,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Activation is not part of it.
    pub fn apply(&mut self, patch: BarberPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_owned();
        }
        if let Some(specialties) = patch.specialties {
            self.specialties = specialties;
        }
        if let Some(experience) = patch.experience {
            self.experience = experience;
        }
        if patch.profile_picture.is_some() {
            self.profile_picture = patch.profile_picture;
        }
        if patch.phone_number.is_some() {
            self.phone_number = patch.phone_number;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.bio.is_some() {
            self.bio = patch.bio;
        }
        if let Some(availability) = patch.availability {
            self.availability = availability;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive match of `needle` (already lowercase) against one
    /// of the specialties.
    pub fn has_specialty(&self, needle: &str) -> bool {
        self.specialties
            .iter()
            .any(|specialty| specialty.to_lowercase().contains(needle))
    }
}

/// Working slot of a barber.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub day: Weekday,
    #[validate(length(min = 1, message = "Start time is required."))]
    pub start_time: String,
    #[validate(length(min = 1, message = "End time is required."))]
    pub end_time: String,
    #[serde(default = "available")]
    pub is_available: bool,
}

fn available() -> bool {
    true
}

/// Body of a barber creation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BarberProfile {
    #[validate(length(min = 2, message = "Barber name must be at least 2 characters long."))]
    pub name: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[validate(range(min = 0, message = "Experience must be a positive number."))]
    pub experience: Option<i32>,
    pub profile_picture: Option<String>,
    pub phone_number: Option<String>,
    #[validate(email(message = "Invalid email format."))]
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub availability: Vec<Availability>,
}

/// Partial update of a barber.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BarberPatch {
    #[validate(length(min = 2, message = "Barber name must be at least 2 characters long."))]
    pub name: Option<String>,
    pub specialties: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Experience must be a positive number."))]
    pub experience: Option<i32>,
    pub profile_picture: Option<String>,
    pub phone_number: Option<String>,
    #[validate(email(message = "Invalid email format."))]
    pub email: Option<String>,
    pub bio: Option<String>,
    #[validate(nested)]
    pub availability: Option<Vec<Availability>>,
}

/// Body replacing the availability of a barber.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AvailabilityUpdate {
    #[validate(nested)]
    pub availability: Vec<Availability>,
}
