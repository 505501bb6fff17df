// Domain layer module exports
// Following Hexagonal Architecture and DDD principles
// Domain is independent of the web layer; repositories are ports

pub mod account;
pub mod errors;
pub mod geo;
pub mod pharmacy;
pub mod repositories;
