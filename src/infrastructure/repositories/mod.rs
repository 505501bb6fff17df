// Repository implementations (data access layer)
// Adapters that implement domain repository interfaces

pub mod postgres_pharmacy_repository;

pub use postgres_pharmacy_repository::PostgresPharmacyRepository;
