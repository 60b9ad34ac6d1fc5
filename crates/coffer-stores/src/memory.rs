//! In-memory backends
//!
//! Stand-ins for the native primitives of every backend family, behaving
//! like the real services for the cases Coffer relies on (existence checks,
//! empty containers, per-namespace permissions). The integration tests wire
//! every adapter to these.

use crate::kubernetes::{SecretObject, SecretObjectApi};
use crate::protocol::{BlobStore, StoredBlob};
use crate::vault::{KvData, VaultKv};
use async_trait::async_trait;
use coffer_core::{BackendKind, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

type Key = (String, String);

fn key(location: &str, name: &str) -> Key {
    (location.to_string(), name.to_string())
}

/// Opaque-blob store
///
/// Containers created for GCP hold no payload until the first put, as in
/// Secret Manager; every other backend stores the initial value on create.
pub struct MemoryBlobStore {
    backend: BackendKind,
    blobs: RwLock<BTreeMap<Key, Option<String>>>,
    fail_puts: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            blobs: RwLock::new(BTreeMap::new()),
            fail_puts: AtomicBool::new(false),
        }
    }

    /// Store `payload` directly, bypassing the protocol
    pub async fn insert(&self, location: &str, name: &str, payload: Option<&str>) {
        self.blobs
            .write()
            .await
            .insert(key(location, name), payload.map(str::to_string));
    }

    /// The raw stored payload; `None` when the container does not exist
    pub async fn payload(&self, location: &str, name: &str) -> Option<Option<String>> {
        self.blobs.read().await.get(&key(location, name)).cloned()
    }

    /// Make every subsequent put fail with `Transport`
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    fn handle(location: &str, name: &str) -> String {
        format!("{}/{}", location, name)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        let k = key(location, name);
        if blobs.contains_key(&k) {
            return Err(Error::already_exists(Self::handle(location, name)));
        }
        let payload = match self.backend {
            BackendKind::GcpSecretManager => None,
            _ => Some(initial.to_string()),
        };
        blobs.insert(k, payload);
        Ok(())
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        self.blobs
            .read()
            .await
            .get(&key(location, name))
            .map(|payload| StoredBlob::new(Self::handle(location, name), payload.clone()))
            .ok_or_else(|| Error::not_found(Self::handle(location, name)))
    }

    async fn put(&self, _location: &str, handle: &str, payload: &str) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::transport(format!("put {} refused", handle)));
        }
        let Some((location, name)) = handle.split_once('/') else {
            return Err(Error::not_found(handle.to_string()));
        };
        let mut blobs = self.blobs.write().await;
        match blobs.get_mut(&key(location, name)) {
            Some(slot) => {
                *slot = Some(payload.to_string());
                Ok(())
            }
            None => Err(Error::not_found(handle.to_string())),
        }
    }
}

/// Kubernetes Secrets API
#[derive(Default)]
pub struct MemorySecretObjectApi {
    objects: RwLock<BTreeMap<Key, SecretObject>>,
    denied: RwLock<BTreeSet<String>>,
    revision: AtomicU64,
}

impl MemorySecretObjectApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call touching `namespace` with `AccessDenied`
    pub async fn deny_namespace(&self, namespace: &str) {
        self.denied.write().await.insert(namespace.to_string());
    }

    /// The stored object, if any
    pub async fn object(&self, namespace: &str, name: &str) -> Option<SecretObject> {
        self.objects.read().await.get(&key(namespace, name)).cloned()
    }

    async fn check_access(&self, namespace: &str) -> Result<()> {
        if self.denied.read().await.contains(namespace) {
            return Err(Error::access_denied(format!(
                "secrets is forbidden in namespace {}",
                namespace
            )));
        }
        Ok(())
    }

    fn stamp(&self, namespace: &str, object: &SecretObject) -> SecretObject {
        let mut stored = object.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.resource_version =
            Some((self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string());
        // The API server folds stringData into data
        let string_data = std::mem::take(&mut stored.string_data);
        for (k, v) in string_data {
            stored.data.insert(k, v.into_bytes());
        }
        stored
    }
}

#[async_trait]
impl SecretObjectApi for MemorySecretObjectApi {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretObject> {
        self.check_access(namespace).await?;
        self.object(namespace, name)
            .await
            .ok_or_else(|| Error::not_found(format!("secrets \"{}\" not found", name)))
    }

    async fn create(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        self.check_access(namespace).await?;
        let mut objects = self.objects.write().await;
        let k = key(namespace, object.name());
        if objects.contains_key(&k) {
            return Err(Error::already_exists(format!(
                "secrets \"{}\" already exists",
                object.name()
            )));
        }
        let stored = self.stamp(namespace, object);
        objects.insert(k, stored.clone());
        Ok(stored)
    }

    async fn update(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        self.check_access(namespace).await?;
        let mut objects = self.objects.write().await;
        let k = key(namespace, object.name());
        if !objects.contains_key(&k) {
            return Err(Error::not_found(format!(
                "secrets \"{}\" not found",
                object.name()
            )));
        }
        let stored = self.stamp(namespace, object);
        objects.insert(k, stored.clone());
        Ok(stored)
    }
}

/// Vault KV v2 engine
#[derive(Default)]
pub struct MemoryVaultKv {
    secrets: RwLock<BTreeMap<Key, KvData>>,
}

impl MemoryVaultKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn data(&self, location: &str, path: &str) -> Option<KvData> {
        self.secrets.read().await.get(&key(location, path)).cloned()
    }
}

#[async_trait]
impl VaultKv for MemoryVaultKv {
    async fn read(&self, location: &str, path: &str) -> Result<Option<KvData>> {
        Ok(self.data(location, path).await)
    }

    async fn write(&self, location: &str, path: &str, data: &KvData) -> Result<()> {
        self.secrets
            .write()
            .await
            .insert(key(location, path), data.clone());
        Ok(())
    }
}
