//! Secure credential handling using the secrecy crate
//!
//! The reporting database connection string carries a password. It is held
//! as a [`SecretString`], which zeroes its memory on drop and redacts itself
//! in `Debug` output. Call `expose_secret()` only at the point of connecting.
//!
//! # Example
//!
//! ```rust
//! use pacemetrics::config::{secret_string, redact_connection_string};
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://report:pw@db.internal:5432/reporting".to_string());
//! assert!(format!("{dsn:?}").contains("REDACTED"));
//! assert_eq!(redact_connection_string(&dsn), "postgresql://***@db.internal:5432/reporting");
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string: zeroed on drop, redacted in Debug, explicit access only
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with credentials replaced, safe for logs and console
pub fn redact_connection_string(secret: &SecretString) -> String {
    let raw = secret.expose_secret().as_ref();
    let scheme_end = raw.find("://").map(|i| i + 3).unwrap_or(0);
    match raw.rfind('@') {
        Some(at) if at >= scheme_end => format!("{}***{}", &raw[..scheme_end], &raw[at..]),
        _ => raw.to_string(),
    }
}
