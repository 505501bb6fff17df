use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{JsonBody, PharmacyId};
use crate::api::AppState;
use crate::auth::password::hash_password;
use crate::domain::account::{Email, NewAccount, Role};
use crate::domain::geo::GeoPoint;
use crate::domain::pharmacy::{
    parse_time_of_day, LinkedPharmacy, NearbyPharmacy, NewPharmacy, PharmacyService,
};
use crate::infrastructure::repositories::PostgresPharmacyRepository;

/// Request body for pharmacy registration
///
/// Required fields are optional here so a missing one yields a 400 with a
/// readable message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterPharmacyRequest {
    #[serde(alias = "pharmacy_name")]
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

/// Query string for proximity search
///
/// Values are parsed by hand so malformed numbers surface as validation
/// errors in the usual JSON shape.
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
}

/// A pharmacy as returned by the API
#[derive(Debug, Serialize)]
pub struct PharmacyResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<LinkedPharmacy> for PharmacyResponse {
    fn from(p: LinkedPharmacy) -> Self {
        Self {
            id: p.id,
            name: p.name,
            address: p.address,
            phone: p.phone,
            latitude: p.location.map(|l| l.latitude()),
            longitude: p.location.map(|l| l.longitude()),
            open_time: p.open_time,
            close_time: p.close_time,
            user_id: p.user_id,
            email: p.email.to_string(),
            username: p.username,
            role: p.role,
            distance_km: None,
        }
    }
}

impl From<NearbyPharmacy> for PharmacyResponse {
    fn from(hit: NearbyPharmacy) -> Self {
        Self {
            distance_km: Some(hit.distance_km),
            ..Self::from(hit.pharmacy)
        }
    }
}

/// Response for list endpoints
#[derive(Debug, Serialize)]
pub struct PharmacyListResponse {
    pub pharmacies: Vec<PharmacyResponse>,
    pub count: usize,
}

impl<T: Into<PharmacyResponse>> FromIterator<T> for PharmacyListResponse {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let pharmacies: Vec<PharmacyResponse> = iter.into_iter().map(Into::into).collect();
        Self {
            count: pharmacies.len(),
            pharmacies,
        }
    }
}

fn service(pool: PgPool) -> PharmacyService<PostgresPharmacyRepository> {
    PharmacyService::new(PostgresPharmacyRepository::new(pool))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} is required", field)))
}

fn optional_time(value: Option<String>) -> Result<Option<NaiveTime>, ApiError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(parse_time_of_day(raw)?)),
        None => Ok(None),
    }
}

fn optional_number(value: Option<String>, field: &str) -> Result<Option<f64>, ApiError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{} must be a number", field))),
        None => Ok(None),
    }
}

/// Register a pharmacy together with its account
///
/// POST /api/pharmacies/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterPharmacyRequest>,
) -> Result<(StatusCode, Json<PharmacyResponse>), ApiError> {
    let name = required(req.name, "name")?;
    let address = required(req.address, "address")?;
    let phone = required(req.phone, "phone")?;
    let username = required(req.username, "username")?;
    let password = required(req.password, "password")?;
    let email = Email::new(required(req.email, "email")?)
        .map_err(|e| ApiError::bad_request(e))?;

    let pharmacy = NewPharmacy {
        name,
        address,
        phone,
        location: GeoPoint::from_parts(req.latitude, req.longitude)?,
        open_time: optional_time(req.open_time)?,
        close_time: optional_time(req.close_time)?,
    };

    tracing::info!(name = %pharmacy.name, "Registering pharmacy");

    let cost = state.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Hashing task failed: {}", e)))??;

    let account = NewAccount {
        username,
        email,
        password_hash,
    };

    let created = service(state.pool).register(account, pharmacy).await?;

    Ok((StatusCode::CREATED, Json(PharmacyResponse::from(created))))
}

/// List all pharmacies
///
/// GET /api/pharmacies
pub async fn list_pharmacies(
    State(state): State<AppState>,
) -> Result<Json<PharmacyListResponse>, ApiError> {
    let pharmacies = service(state.pool).list().await?;
    tracing::debug!(count = pharmacies.len(), "Listed pharmacies");
    Ok(Json(pharmacies.into_iter().collect()))
}

/// Find pharmacies near a point
///
/// GET /api/pharmacies/nearby?latitude=..&longitude=..&radius=..
pub async fn nearby_pharmacies(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<PharmacyListResponse>, ApiError> {
    let latitude = optional_number(query.latitude, "latitude")?;
    let longitude = optional_number(query.longitude, "longitude")?;
    let radius = optional_number(query.radius, "radius")?;

    let hits = service(state.pool)
        .nearby(latitude, longitude, radius)
        .await?;

    Ok(Json(hits.into_iter().collect()))
}

/// Get a pharmacy by ID
///
/// GET /api/pharmacies/id/:id
pub async fn get_pharmacy(
    State(state): State<AppState>,
    PharmacyId(id): PharmacyId,
) -> Result<Json<PharmacyResponse>, ApiError> {
    let pharmacy = service(state.pool).get(id).await?;
    Ok(Json(pharmacy.into()))
}

/// Get a pharmacy by its account email
///
/// GET /api/pharmacies/email/:email
pub async fn get_pharmacy_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<PharmacyResponse>, ApiError> {
    let email = Email::new(&email).map_err(|e| ApiError::bad_request(e))?;
    let pharmacy = service(state.pool).get_by_email(&email).await?;
    Ok(Json(pharmacy.into()))
}

/// Get a pharmacy by phone number
///
/// GET /api/pharmacies/phone/:phone
pub async fn get_pharmacy_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<PharmacyResponse>, ApiError> {
    let pharmacy = service(state.pool).get_by_phone(phone.trim()).await?;
    Ok(Json(pharmacy.into()))
}

/// Update allowlisted profile fields
///
/// PUT /api/pharmacies/:id
pub async fn update_pharmacy(
    State(state): State<AppState>,
    PharmacyId(id): PharmacyId,
    JsonBody(changes): JsonBody<Map<String, Value>>,
) -> Result<Json<PharmacyResponse>, ApiError> {
    tracing::info!(pharmacy_id = %id, "Updating pharmacy");
    let pharmacy = service(state.pool).update(id, &changes).await?;
    Ok(Json(pharmacy.into()))
}

/// Delete a pharmacy and its account
///
/// DELETE /api/pharmacies/:id
pub async fn delete_pharmacy(
    State(state): State<AppState>,
    PharmacyId(id): PharmacyId,
) -> Result<StatusCode, ApiError> {
    tracing::info!(pharmacy_id = %id, "Deleting pharmacy");
    service(state.pool).remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank() {
        assert!(required(None, "name").is_err());
        assert!(required(Some("  ".to_string()), "name").is_err());
        assert_eq!(required(Some(" Boots ".to_string()), "name").unwrap(), "Boots");
    }

    #[test]
    fn optional_number_parses_or_rejects() {
        assert_eq!(optional_number(None, "radius").unwrap(), None);
        assert_eq!(optional_number(Some("".to_string()), "radius").unwrap(), None);
        assert_eq!(optional_number(Some("2.5".to_string()), "radius").unwrap(), Some(2.5));
        assert!(optional_number(Some("far".to_string()), "radius").is_err());
    }

    #[test]
    fn out_of_range_registration_coordinates_are_rejected() {
        let req: RegisterPharmacyRequest =
            serde_json::from_str(r#"{"latitude": 500, "longitude": 0}"#).unwrap();
        assert!(GeoPoint::from_parts(req.latitude, req.longitude).is_err());
    }

    #[test]
    fn register_request_accepts_pharmacy_name_alias() {
        let req: RegisterPharmacyRequest =
            serde_json::from_str(r#"{"pharmacy_name": "Green Cross"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Green Cross"));
    }

    #[test]
    fn nearby_response_carries_distance() {
        let pharmacy = LinkedPharmacy {
            id: Uuid::new_v4(),
            name: "Green Cross".to_string(),
            address: "2 Elm Rd".to_string(),
            phone: "555-0101".to_string(),
            location: Some(GeoPoint::new(1.0, 2.0).unwrap()),
            open_time: None,
            close_time: None,
            user_id: Uuid::new_v4(),
            email: Email::new("green@cross.test").unwrap(),
            username: "greencross".to_string(),
            role: Role::Pharmacy,
        };

        let body = serde_json::to_value(PharmacyResponse::from(NearbyPharmacy {
            pharmacy: pharmacy.clone(),
            distance_km: 1.5,
        }))
        .unwrap();
        assert_eq!(body["distance_km"], 1.5);
        assert_eq!(body["latitude"], 1.0);
        assert_eq!(body["role"], "pharmacy");

        let plain = serde_json::to_value(PharmacyResponse::from(pharmacy)).unwrap();
        assert!(plain.get("distance_km").is_none());
    }
}
