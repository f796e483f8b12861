//! Lookup of provider API keys.

use keyring::Entry;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential store lookup failed for '{provider}'")]
    Keyring {
        provider: String,
        #[source]
        source: keyring::Error,
    },
}

/// Source of provider secrets, keyed by the provider's secret name.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when the store has no secret for `provider`.
    fn get_credential(&self, provider: &str) -> Result<Option<String>, CredentialError>;
}

/// Secrets kept in the operating system keyring under `(service, provider)`.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get_credential(&self, provider: &str) -> Result<Option<String>, CredentialError> {
        let keyring_err = |source| CredentialError::Keyring {
            provider: provider.to_string(),
            source,
        };
        let entry = Entry::new(&self.service, provider).map_err(keyring_err)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_err(e)),
        }
    }
}

/// Fixed in-memory secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    secrets: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, provider: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(provider.into(), secret.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn get_credential(&self, provider: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.secrets.get(provider).cloned())
    }
}
