// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::{health, pharmacies};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub bcrypt_cost: u32,
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pharmacy routes
        .route("/api/pharmacies", get(pharmacies::list_pharmacies))
        .route("/api/pharmacies/register", post(pharmacies::register))
        .route("/api/pharmacies/nearby", get(pharmacies::nearby_pharmacies))
        .route("/api/pharmacies/id/:id", get(pharmacies::get_pharmacy))
        .route(
            "/api/pharmacies/email/:email",
            get(pharmacies::get_pharmacy_by_email),
        )
        .route(
            "/api/pharmacies/phone/:phone",
            get(pharmacies::get_pharmacy_by_phone),
        )
        .route(
            "/api/pharmacies/:id",
            put(pharmacies::update_pharmacy).delete(pharmacies::delete_pharmacy),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(state)
}
