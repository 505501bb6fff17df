use serde_json::{Map, Value};
use uuid::Uuid;

use super::{build_update, BoundValue, LinkedPharmacy, NearbyPharmacy, NewPharmacy};
use crate::domain::account::{Email, NewAccount};
use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::geo::{radius_or_default, GeoPoint};
use crate::domain::repositories::PharmacyRepository;

/// Coordinates pharmacy onboarding, updates, removal and discovery
///
/// Performs the lookups that must precede each repository call (uniqueness
/// pre-checks, existence, coordinate pairing) and delegates persistence to
/// the injected [`PharmacyRepository`].
pub struct PharmacyService<R> {
    repo: R,
}

impl<R: PharmacyRepository> PharmacyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Onboard a pharmacy together with its account
    ///
    /// Email, username and phone are checked up front so the caller gets a
    /// precise conflict. Concurrent registrations can still race past these
    /// checks; the store's unique constraints settle those and the repository
    /// reports them as `UniquenessConflict` too.
    pub async fn register(
        &self,
        account: NewAccount,
        pharmacy: NewPharmacy,
    ) -> RepositoryResult<LinkedPharmacy> {
        if self.repo.email_exists(&account.email).await? {
            return Err(RepositoryError::UniquenessConflict("email".to_string()));
        }
        if self.repo.username_exists(&account.username).await? {
            return Err(RepositoryError::UniquenessConflict("username".to_string()));
        }
        if self.repo.phone_exists(&pharmacy.phone).await? {
            return Err(RepositoryError::UniquenessConflict("phone".to_string()));
        }

        let created = self.repo.create(account, pharmacy).await?;
        tracing::info!(pharmacy_id = %created.id, name = %created.name, "pharmacy registered");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> RepositoryResult<LinkedPharmacy> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(RepositoryError::pharmacy_not_found)
    }

    pub async fn get_by_email(&self, email: &Email) -> RepositoryResult<LinkedPharmacy> {
        self.repo
            .find_by_email(email)
            .await?
            .ok_or_else(RepositoryError::pharmacy_not_found)
    }

    pub async fn get_by_phone(&self, phone: &str) -> RepositoryResult<LinkedPharmacy> {
        self.repo
            .find_by_phone(phone)
            .await?
            .ok_or_else(RepositoryError::pharmacy_not_found)
    }

    pub async fn list(&self) -> RepositoryResult<Vec<LinkedPharmacy>> {
        self.repo.find_all().await
    }

    /// Apply a sparse set of profile changes
    ///
    /// Account fields are never touched. A new phone is re-checked against
    /// existing pharmacies first; that check and the update are not atomic,
    /// so the unique constraint remains the final arbiter.
    pub async fn update(
        &self,
        id: Uuid,
        changes: &Map<String, Value>,
    ) -> RepositoryResult<LinkedPharmacy> {
        let existing = self.get(id).await?;
        let statement = build_update(id, changes)?;

        if let Some(phone) = statement.value_for("phone").and_then(BoundValue::as_text) {
            if phone != existing.phone && self.repo.phone_exists(phone).await? {
                return Err(RepositoryError::UniquenessConflict("phone".to_string()));
            }
        }

        let latitude = statement
            .value_for("latitude")
            .and_then(BoundValue::as_float)
            .or(existing.location.map(|p| p.latitude()));
        let longitude = statement
            .value_for("longitude")
            .and_then(BoundValue::as_float)
            .or(existing.location.map(|p| p.longitude()));
        GeoPoint::from_parts(latitude, longitude)?;

        let updated = self
            .repo
            .update(statement)
            .await?
            .ok_or_else(RepositoryError::pharmacy_not_found)?;
        tracing::info!(pharmacy_id = %id, "pharmacy updated");
        Ok(updated)
    }

    /// Remove a pharmacy and its account
    pub async fn remove(&self, id: Uuid) -> RepositoryResult<()> {
        self.repo.delete(id).await?;
        tracing::info!(pharmacy_id = %id, "pharmacy deleted");
        Ok(())
    }

    /// Pharmacies within `radius_km` (default 10) of the given point
    ///
    /// An empty result is a success.
    pub async fn nearby(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_km: Option<f64>,
    ) -> RepositoryResult<Vec<NearbyPharmacy>> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(RepositoryError::validation(
                "latitude and longitude are required",
            ));
        };
        let origin = GeoPoint::new(latitude, longitude)?;
        let radius_km = radius_or_default(radius_km)?;

        let found = self.repo.find_nearby(origin, radius_km).await?;
        tracing::debug!(count = found.len(), radius_km, "nearby pharmacies found");
        Ok(found)
    }
}
