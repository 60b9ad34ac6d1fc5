//! Common helpers for coffer-stores integration tests
//!
//! Every adapter is wired to the in-memory backends from
//! `coffer_stores::memory`, so the tests exercise the real merge and
//! replication code without network access.

#![allow(dead_code)]

use coffer_core::{BackendKind, PropertyMap};
use coffer_stores::kubernetes::KubernetesSecretManager;
use coffer_stores::memory::{MemoryBlobStore, MemorySecretObjectApi, MemoryVaultKv};
use coffer_stores::vault::VaultSecretManager;
use coffer_stores::BlobSecretManager;

pub type BlobManager = BlobSecretManager<MemoryBlobStore>;
pub type KubeManager = KubernetesSecretManager<MemorySecretObjectApi>;
pub type VaultManager = VaultSecretManager<MemoryVaultKv>;

/// The opaque-blob backends
pub const BLOB_BACKENDS: [BackendKind; 4] = [
    BackendKind::AwsSecretsManager,
    BackendKind::AwsParameterStore,
    BackendKind::GcpSecretManager,
    BackendKind::AzureKeyVault,
];

pub fn blob_manager(kind: BackendKind) -> BlobManager {
    BlobSecretManager::new(MemoryBlobStore::new(kind))
}

pub fn kube_manager() -> KubeManager {
    KubernetesSecretManager::new(MemorySecretObjectApi::new())
}

pub fn vault_manager() -> VaultManager {
    VaultSecretManager::new(MemoryVaultKv::new())
}

/// Build a property map from literal pairs
pub fn props(pairs: &[(&str, &str)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Decode a structured payload, panicking with the payload on failure
pub fn decode(payload: &str) -> PropertyMap {
    serde_json::from_str(payload)
        .unwrap_or_else(|e| panic!("payload {:?} is not a property map: {}", payload, e))
}

/// Data of a Kubernetes Secret as strings
pub async fn kube_data(manager: &KubeManager, namespace: &str, name: &str) -> Option<PropertyMap> {
    manager
        .api()
        .object(namespace, name)
        .await
        .map(|object| object.property_map().expect("stored data is UTF-8"))
}
