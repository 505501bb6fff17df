// Pharmacy domain module
// A pharmacy profile is always paired with exactly one pharmacy account

pub mod service;
pub mod update;

pub use service::PharmacyService;
pub use update::{build_update, BoundValue, UpdateStatement};

use chrono::NaiveTime;
use uuid::Uuid;

use crate::domain::account::{Email, Role};
use crate::domain::errors::RepositoryError;
use crate::domain::geo::{GeoPoint, Located};

/// Profile data supplied at onboarding
#[derive(Debug, Clone, PartialEq)]
pub struct NewPharmacy {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub location: Option<GeoPoint>,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

/// A pharmacy profile merged with its owning account
///
/// This is the shape returned by every read and by onboarding.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedPharmacy {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub location: Option<GeoPoint>,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub user_id: Uuid,
    pub email: Email,
    pub username: String,
    pub role: Role,
}

impl Located for LinkedPharmacy {
    fn id(&self) -> Uuid {
        self.id
    }

    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

/// A proximity search hit
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPharmacy {
    pub pharmacy: LinkedPharmacy,
    pub distance_km: f64,
}

/// Parses a time of day in `HH:MM` or `HH:MM:SS` form
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, RepositoryError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            RepositoryError::validation(format!(
                "invalid time of day '{}', expected HH:MM or HH:MM:SS",
                value
            ))
        })
}
