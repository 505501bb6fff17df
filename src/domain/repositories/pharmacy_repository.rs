use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::account::{Email, NewAccount};
use crate::domain::errors::RepositoryResult;
use crate::domain::geo::GeoPoint;
use crate::domain::pharmacy::{LinkedPharmacy, NearbyPharmacy, NewPharmacy, UpdateStatement};

/// Repository trait for the (account, pharmacy profile) pair
///
/// `create` and `delete` are all-or-nothing across both tables.
/// Implementations must never leave an account without its profile or a
/// profile without its account.
#[async_trait]
pub trait PharmacyRepository: Send + Sync {
    /// Insert the account and its profile in one transaction
    ///
    /// The account role is always `pharmacy`. A unique violation on email,
    /// username or phone yields `UniquenessConflict` and nothing persists.
    async fn create(
        &self,
        account: NewAccount,
        pharmacy: NewPharmacy,
    ) -> RepositoryResult<LinkedPharmacy>;

    /// Delete the profile and then its account in one transaction
    ///
    /// Returns `NotFound` without mutating anything when the profile is absent.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// Execute a statement produced by `build_update`
    ///
    /// Returns the updated pharmacy, or `None` when no row matched.
    async fn update(&self, statement: UpdateStatement) -> RepositoryResult<Option<LinkedPharmacy>>;

    /// Find a pharmacy by its profile id
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<LinkedPharmacy>>;

    /// Find a pharmacy by its account email (case-insensitive)
    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<LinkedPharmacy>>;

    /// Find a pharmacy by phone number
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<LinkedPharmacy>>;

    /// All pharmacies ordered by name
    async fn find_all(&self) -> RepositoryResult<Vec<LinkedPharmacy>>;

    /// Pharmacies within `radius_km` of `origin`, nearest first
    async fn find_nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> RepositoryResult<Vec<NearbyPharmacy>>;

    /// Whether any account uses `email` (case-insensitive)
    async fn email_exists(&self, email: &Email) -> RepositoryResult<bool>;

    /// Whether any account uses `username`
    async fn username_exists(&self, username: &str) -> RepositoryResult<bool>;

    /// Whether any pharmacy uses `phone`
    async fn phone_exists(&self, phone: &str) -> RepositoryResult<bool>;
}
