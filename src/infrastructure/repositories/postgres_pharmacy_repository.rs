use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::account::{Email, NewAccount, Role};
use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::geo::{rank_within, BoundingBox, GeoPoint};
use crate::domain::pharmacy::{
    BoundValue, LinkedPharmacy, NearbyPharmacy, NewPharmacy, UpdateStatement,
};
use crate::domain::repositories::PharmacyRepository;

const LINKED_COLUMNS: &str = "p.id, p.pharmacy_name, p.address, p.phone, \
     p.latitude, p.longitude, p.open_time, p.close_time, \
     p.user_id, u.email, u.username, u.role";

/// Joined pharmacy + account row
#[derive(Debug, sqlx::FromRow)]
struct PharmacyRow {
    id: Uuid,
    pharmacy_name: String,
    address: String,
    phone: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    open_time: Option<NaiveTime>,
    close_time: Option<NaiveTime>,
    user_id: Uuid,
    email: String,
    username: String,
    role: Role,
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    username: String,
    role: Role,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    pharmacy_name: String,
    address: String,
    phone: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    open_time: Option<NaiveTime>,
    close_time: Option<NaiveTime>,
}

impl TryFrom<PharmacyRow> for LinkedPharmacy {
    type Error = RepositoryError;

    fn try_from(r: PharmacyRow) -> Result<Self, Self::Error> {
        let email = Email::new(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {}", e))
        })?;
        let location = GeoPoint::from_parts(r.latitude, r.longitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("pharmacy {} coordinates: {}", r.id, e))
        })?;

        Ok(LinkedPharmacy {
            id: r.id,
            name: r.pharmacy_name,
            address: r.address,
            phone: r.phone,
            location,
            open_time: r.open_time,
            close_time: r.close_time,
            user_id: r.user_id,
            email,
            username: r.username,
            role: r.role,
        })
    }
}

fn select_linked(filter: &str) -> String {
    format!(
        "SELECT {} FROM pharmacies p JOIN users u ON u.id = p.user_id {}",
        LINKED_COLUMNS, filter
    )
}

/// Names the field behind a violated unique constraint
fn conflicting_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email",
        Some("users_username_key") => "username",
        Some("pharmacies_phone_key") => "phone",
        Some("pharmacies_user_id_key") => "account",
        _ => "record",
    }
}

/// Maps store failures onto domain outcomes
///
/// Unique violations become `UniquenessConflict` so a registration that
/// loses a race reports the same outcome as one caught by the pre-checks.
fn map_store_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::UniquenessConflict(
                conflicting_field(db_err.constraint()).to_string(),
            );
        }
        if db_err.is_check_violation() {
            return RepositoryError::validation(db_err.message().to_string());
        }
    }
    RepositoryError::Store(err)
}

/// PostgreSQL implementation of PharmacyRepository
///
/// Pair creation and deletion each run inside a single transaction that is
/// explicitly rolled back before any error propagates.
pub struct PostgresPharmacyRepository {
    pool: PgPool,
}

impl PostgresPharmacyRepository {
    /// Creates a new PostgresPharmacyRepository
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn finish<T>(
        tx: Transaction<'_, Postgres>,
        outcome: RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(map_store_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn insert_pair(
        tx: &mut Transaction<'_, Postgres>,
        account: NewAccount,
        pharmacy: NewPharmacy,
    ) -> RepositoryResult<LinkedPharmacy> {
        let account_row: AccountRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, email, username, role
            "#,
        )
        .bind(&account.username)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(Role::Pharmacy)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_store_error)?;

        let profile: ProfileRow = sqlx::query_as(
            r#"
            INSERT INTO pharmacies (
                pharmacy_name, address, phone, latitude, longitude,
                open_time, close_time, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, pharmacy_name, address, phone,
                      latitude, longitude, open_time, close_time
            "#,
        )
        .bind(&pharmacy.name)
        .bind(&pharmacy.address)
        .bind(&pharmacy.phone)
        .bind(pharmacy.location.map(|p| p.latitude()))
        .bind(pharmacy.location.map(|p| p.longitude()))
        .bind(pharmacy.open_time)
        .bind(pharmacy.close_time)
        .bind(account_row.id)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_store_error)?;

        LinkedPharmacy::try_from(PharmacyRow {
            id: profile.id,
            pharmacy_name: profile.pharmacy_name,
            address: profile.address,
            phone: profile.phone,
            latitude: profile.latitude,
            longitude: profile.longitude,
            open_time: profile.open_time,
            close_time: profile.close_time,
            user_id: account_row.id,
            email: account_row.email,
            username: account_row.username,
            role: account_row.role,
        })
    }

    async fn delete_pair(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> RepositoryResult<()> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM pharmacies WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

        let Some(user_id) = owner else {
            return Err(RepositoryError::pharmacy_not_found());
        };

        sqlx::query("DELETE FROM pharmacies WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let removed = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        if removed.rows_affected() != 1 {
            return Err(RepositoryError::DataCorruption(format!(
                "pharmacy {} references missing account {}",
                id, user_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl PharmacyRepository for PostgresPharmacyRepository {
    async fn create(
        &self,
        account: NewAccount,
        pharmacy: NewPharmacy,
    ) -> RepositoryResult<LinkedPharmacy> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::insert_pair(&mut tx, account, pharmacy).await;
        Self::finish(tx, outcome).await
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::delete_pair(&mut tx, id).await;
        Self::finish(tx, outcome).await
    }

    async fn update(&self, statement: UpdateStatement) -> RepositoryResult<Option<LinkedPharmacy>> {
        let sql = format!(
            "WITH p AS ({} RETURNING *) SELECT {} FROM p JOIN users u ON u.id = p.user_id",
            statement.sql(),
            LINKED_COLUMNS
        );

        let mut query = sqlx::query_as::<_, PharmacyRow>(&sql);
        for value in statement.into_values() {
            query = match value {
                BoundValue::Text(text) => query.bind(text),
                BoundValue::Float(number) => query.bind(number),
                BoundValue::Time(time) => query.bind(time),
                BoundValue::Id(id) => query.bind(id),
            };
        }

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_store_error)?
            .map(LinkedPharmacy::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<LinkedPharmacy>> {
        sqlx::query_as::<_, PharmacyRow>(&select_linked("WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LinkedPharmacy::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<LinkedPharmacy>> {
        sqlx::query_as::<_, PharmacyRow>(&select_linked("WHERE LOWER(u.email) = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(LinkedPharmacy::try_from)
            .transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<LinkedPharmacy>> {
        sqlx::query_as::<_, PharmacyRow>(&select_linked("WHERE p.phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?
            .map(LinkedPharmacy::try_from)
            .transpose()
    }

    async fn find_all(&self) -> RepositoryResult<Vec<LinkedPharmacy>> {
        sqlx::query_as::<_, PharmacyRow>(&select_linked("ORDER BY p.pharmacy_name, p.id"))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LinkedPharmacy::try_from)
            .collect()
    }

    async fn find_nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> RepositoryResult<Vec<NearbyPharmacy>> {
        let bbox = BoundingBox::around(&origin, radius_km);

        let candidates = sqlx::query_as::<_, PharmacyRow>(&select_linked(
            "WHERE p.latitude BETWEEN $1 AND $2 AND p.longitude BETWEEN $3 AND $4",
        ))
        .bind(bbox.min_latitude)
        .bind(bbox.max_latitude)
        .bind(bbox.min_longitude)
        .bind(bbox.max_longitude)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LinkedPharmacy::try_from)
        .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(rank_within(&origin, radius_km, candidates)
            .into_iter()
            .map(|(pharmacy, distance_km)| NearbyPharmacy {
                pharmacy,
                distance_km,
            })
            .collect())
    }

    async fn email_exists(&self, email: &Email) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn phone_exists(&self, phone: &str) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pharmacies WHERE phone = $1)")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
