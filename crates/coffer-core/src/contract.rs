//! The read/write contract every backend adapter satisfies

use crate::backend::BackendKind;
use crate::error::Result;
use crate::types::SecretLocation;
use crate::value::SecretValue;
use async_trait::async_trait;

/// Backend adapter trait
///
/// Implementations never cache secret content: every call round-trips to
/// the backend, and every failure is returned to the caller unretried.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Which backend this adapter talks to
    fn backend(&self) -> BackendKind;

    /// Read a secret.
    ///
    /// Without a property key (or with an empty one) the full serialized
    /// content is returned. With a key, the content is decoded as a property
    /// map and the key's value returned.
    async fn get_secret(
        &self,
        location: &str,
        name: &str,
        property: Option<&str>,
    ) -> Result<String>;

    /// Write a secret, merging structured content into what is already stored
    async fn set_secret(&self, location: &str, name: &str, value: &SecretValue) -> Result<()>;

    /// Read the secret (or property) addressed by `at`
    async fn get_at(&self, at: &SecretLocation) -> Result<String> {
        self.get_secret(&at.location, &at.name, at.property_key())
            .await
    }

    /// Write the secret addressed by `at`; any property key is ignored
    async fn set_at(&self, at: &SecretLocation, value: &SecretValue) -> Result<()> {
        self.set_secret(&at.location, &at.name, value).await
    }
}

/// Normalizes an optional property key so that `Some("")` means the whole secret
pub fn property_key(property: Option<&str>) -> Option<&str> {
    property.filter(|p| !p.is_empty())
}
