//! Get-merge-set over opaque-blob backends
//!
//! Backends that store a secret as a single string (AWS Secrets Manager,
//! Parameter Store, GCP Secret Manager, Azure Key Vault) only need to supply
//! three primitives. The write protocol built on top of them is:
//!
//! 1. create the container; `AlreadyExists` is not an error
//! 2. fetch the current payload and the handle used for updates
//! 3. merge the new value into the decoded payload
//! 4. put the merged payload through the handle
//!
//! The sequence is not atomic. Two concurrent writers can lose each other's
//! properties, and a failed put leaves an empty container behind.

use async_trait::async_trait;
use coffer_core::contract::property_key;
use coffer_core::value::{existing_property_map, extract_property};
use coffer_core::{BackendKind, Result, SecretContext, SecretManager, SecretValue};
use tracing::debug;

/// Current state of a secret container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Backend identifier used for updates (ARN, resource name, URL)
    pub handle: String,
    /// Current content; `None` when the container holds no value yet
    pub payload: Option<String>,
}

impl StoredBlob {
    pub fn new(handle: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            handle: handle.into(),
            payload,
        }
    }
}

/// Native primitives of an opaque-blob backend
///
/// Every error must carry a normalized kind; in particular `create` fails
/// with `AlreadyExists` and `fetch` with `NotFound` where the backend
/// reports those conditions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Create the container holding `initial`
    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()>;

    /// Read the container's current content and update handle
    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob>;

    /// Replace the content of the container identified by `handle`
    async fn put(&self, location: &str, handle: &str, payload: &str) -> Result<()>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn backend(&self) -> BackendKind {
        (**self).backend()
    }

    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()> {
        (**self).create(location, name, initial).await
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        (**self).fetch(location, name).await
    }

    async fn put(&self, location: &str, handle: &str, payload: &str) -> Result<()> {
        (**self).put(location, handle, payload).await
    }
}

/// Outcome of the idempotent create step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Created,
    AlreadyExisted,
}

/// Run the idempotent create step
pub async fn ensure_container<S: BlobStore + ?Sized>(
    store: &S,
    location: &str,
    name: &str,
    initial: &str,
) -> Result<Ensured> {
    match store.create(location, name, initial).await {
        Ok(()) => Ok(Ensured::Created),
        Err(e) if e.is_already_exists() => Ok(Ensured::AlreadyExisted),
        Err(e) => Err(e),
    }
}

/// Write `value` to `location/name` by get-merge-set
pub async fn get_merge_set<S: BlobStore + ?Sized>(
    store: &S,
    location: &str,
    name: &str,
    value: &SecretValue,
) -> Result<()> {
    let initial = value.to_payload()?;
    let ensured = ensure_container(store, location, name, &initial).await?;
    debug!("{}: container '{}' {:?}", store.backend(), name, ensured);

    let current = store.fetch(location, name).await?;
    debug!(
        "{}: read '{}' ({} bytes)",
        store.backend(),
        name,
        current.payload.as_ref().map(|p| p.len()).unwrap_or(0)
    );

    let existing = if value.is_structured() {
        existing_property_map(current.payload.as_deref())
    } else {
        Default::default()
    };
    let merged = value.merge_with(&existing)?;
    debug!(
        "{}: merged '{}' ({} existing keys, {} new)",
        store.backend(),
        name,
        existing.len(),
        value.property_values.len()
    );

    store.put(location, &current.handle, &merged).await?;
    debug!("{}: wrote '{}'", store.backend(), name);
    Ok(())
}

/// Read `location/name`, optionally narrowed to one property
pub async fn read_blob<S: BlobStore + ?Sized>(
    store: &S,
    location: &str,
    name: &str,
    property: Option<&str>,
) -> Result<String> {
    let blob = store.fetch(location, name).await?;
    let payload = blob.payload.unwrap_or_default();
    match property_key(property) {
        Some(key) => extract_property(&payload, key),
        None => Ok(payload),
    }
}

/// `SecretManager` for any opaque-blob backend
pub struct BlobSecretManager<S> {
    store: S,
}

impl<S: BlobStore> BlobSecretManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: BlobStore> SecretManager for BlobSecretManager<S> {
    fn backend(&self) -> BackendKind {
        self.store.backend()
    }

    async fn get_secret(
        &self,
        location: &str,
        name: &str,
        property: Option<&str>,
    ) -> Result<String> {
        read_blob(&self.store, location, name, property)
            .await
            .secret_context(self.backend(), "read", location, name)
    }

    async fn set_secret(&self, location: &str, name: &str, value: &SecretValue) -> Result<()> {
        get_merge_set(&self.store, location, name, value)
            .await
            .secret_context(self.backend(), "write", location, name)
    }
}
