// Account domain module
// Accounts carry credentials and a role; profiles hang off them

pub mod value_objects;

pub use value_objects::{Email, Role};

/// Account data supplied at onboarding
///
/// `password_hash` is already hashed by the credential component.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
}
