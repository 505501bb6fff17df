use serde::{Deserialize, Serialize};
use std::fmt;

/// Email value object
///
/// # Invariants
/// - Must contain '@' character
/// - Must be at least 3 characters long
/// - Stored lowercased; all lookups and uniqueness checks ignore case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new Email value object
    ///
    /// Surrounding whitespace is trimmed and the address is lowercased.
    ///
    /// # Example
    /// ```
    /// use pharmacy_directory_api::domain::account::Email;
    ///
    /// let email = Email::new("Owner@Example.COM").expect("valid email");
    /// assert_eq!(email.as_str(), "owner@example.com");
    /// ```
    pub fn new(email: impl AsRef<str>) -> Result<Self, String> {
        let email = email.as_ref().trim().to_lowercase();
        if Self::is_valid(&email) {
            Ok(Email(email))
        } else {
            Err(format!("Invalid email: {}", email))
        }
    }

    fn is_valid(email: &str) -> bool {
        email.contains('@') && email.len() >= 3
    }

    /// Returns the email as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

/// Role tag of an account
///
/// Pharmacy onboarding always creates `Pharmacy` accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Pharmacy,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Pharmacy => "pharmacy",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
