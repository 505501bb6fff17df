pub mod health;
pub mod pharmacies;
