//! Pharmacy Directory API Library
//!
//! Pharmacy onboarding and lifecycle management over PostgreSQL: linked
//! account/profile creation and deletion, allowlisted partial updates and
//! proximity search.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
