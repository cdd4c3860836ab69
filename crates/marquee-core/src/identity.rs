use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_PROFILE_LEN: usize = 64;

/// Opaque caller identity. The core trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Wrap an identity the provider has already vouched for
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system-safe, collision-free form: anything outside
    /// `[A-Za-z0-9_-]` is percent-encoded byte by byte
    pub fn storage_key(&self) -> String {
        let mut key = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                key.push(byte as char);
            } else {
                key.push_str(&format!("%{:02X}", byte));
            }
        }
        key
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a presented credential into a caller identity
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, credential: &str) -> Result<CallerIdentity, IdentityError>;
}

/// Single-user identities for the local CLI, one per named profile
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIdentityProvider;

impl IdentityProvider for LocalIdentityProvider {
    fn identify(&self, credential: &str) -> Result<CallerIdentity, IdentityError> {
        let profile = credential.trim();
        if profile.is_empty() {
            return Err(IdentityError::Missing);
        }
        if profile.len() > MAX_PROFILE_LEN {
            return Err(IdentityError::Rejected(format!(
                "profile names are limited to {} characters",
                MAX_PROFILE_LEN
            )));
        }
        if !profile
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(IdentityError::Rejected(format!(
                "profile '{}' may only contain letters, digits, '.', '_' and '-'",
                profile
            )));
        }
        Ok(CallerIdentity::new(format!("local:{}", profile)))
    }
}
