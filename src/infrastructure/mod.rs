// Infrastructure layer module
// Contains database adapters and connection management
// Follows Hexagonal Architecture

pub mod database;
pub mod repositories;
