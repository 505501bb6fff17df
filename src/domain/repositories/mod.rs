// Repository interfaces (ports)
// Implemented by adapters in the infrastructure layer

pub mod pharmacy_repository;

pub use pharmacy_repository::PharmacyRepository;
