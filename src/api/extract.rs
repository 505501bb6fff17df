use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::errors::ApiError;

/// JSON request body whose rejections use the `{"error": ...}` shape
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Pharmacy id taken from the single path parameter
///
/// Usage:
/// ```rust,ignore
/// async fn handler(PharmacyId(id): PharmacyId) -> String {
///     id.to_string()
/// }
/// ```
pub struct PharmacyId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for PharmacyId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;

        Uuid::parse_str(raw.trim())
            .map(PharmacyId)
            .map_err(|_| ApiError::bad_request(format!("invalid pharmacy id: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::util::ServiceExt;

    #[derive(Deserialize)]
    struct Coordinates {
        #[allow(dead_code)]
        latitude: f64,
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/pharmacies/:id",
                get(|PharmacyId(id): PharmacyId| async move { id.to_string() }),
            )
            .route(
                "/coordinates",
                post(|JsonBody(_): JsonBody<Coordinates>| async { "ok" }),
            )
    }

    async fn call(request: Request) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/coordinates")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_id_is_a_json_bad_request() {
        let request = axum::http::Request::builder()
            .uri("/pharmacies/not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid pharmacy id: not-a-uuid");
    }

    #[tokio::test]
    async fn well_formed_id_is_extracted() {
        let id = Uuid::new_v4();
        let request = axum::http::Request::builder()
            .uri(format!("/pharmacies/{}", id))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mistyped_body_field_is_a_json_bad_request() {
        let (status, body) = call(post_json(r#"{"latitude": "north"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("latitude"));
    }

    #[tokio::test]
    async fn unparseable_body_is_a_json_bad_request() {
        let (status, body) = call(post_json("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_content_type_keeps_its_status() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/coordinates")
            .body(Body::from(r#"{"latitude": 1.0}"#))
            .unwrap();

        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());
    }
}
