//! Backend selection
//!
//! Maps backend tags to adapters through an explicit table and wires an
//! already-constructed client into the matching `SecretManager`.

use crate::aws::{ParameterStore, SecretsManagerStore};
use crate::azure::AzureKeyVaultStore;
use crate::gcp::GcpSecretStore;
use crate::kubernetes::{KubernetesSecretManager, SecretObjectApi};
use crate::protocol::{BlobSecretManager, BlobStore};
use crate::vault::{VaultKv, VaultSecretManager};
use aws_config::SdkConfig;
use coffer_core::{BackendKind, Error, Result, SecretManager};
use std::str::FromStr;
use tracing::debug;

/// One row of the backend table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub kind: BackendKind,
    pub description: &'static str,
}

impl BackendDescriptor {
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    /// What the location of a secret means for this backend
    pub fn location(&self) -> &'static str {
        self.kind.location_hint()
    }

    /// Whether the backend stores a native key/value map
    pub fn key_value(&self) -> bool {
        self.kind.is_key_value()
    }
}

/// All supported backends
pub const BACKENDS: &[BackendDescriptor] = &[
    BackendDescriptor {
        kind: BackendKind::AwsSecretsManager,
        description: "AWS Secrets Manager",
    },
    BackendDescriptor {
        kind: BackendKind::AwsParameterStore,
        description: "AWS Systems Manager Parameter Store",
    },
    BackendDescriptor {
        kind: BackendKind::GcpSecretManager,
        description: "Google Cloud Secret Manager",
    },
    BackendDescriptor {
        kind: BackendKind::AzureKeyVault,
        description: "Azure Key Vault",
    },
    BackendDescriptor {
        kind: BackendKind::Kubernetes,
        description: "Kubernetes Secrets",
    },
    BackendDescriptor {
        kind: BackendKind::Vault,
        description: "HashiCorp Vault KV v2",
    },
];

/// Table row for a backend kind
pub fn descriptor(kind: BackendKind) -> Option<&'static BackendDescriptor> {
    BACKENDS.iter().find(|d| d.kind == kind)
}

/// Resolve a backend tag (or one of its aliases)
pub fn lookup(tag: &str) -> Result<BackendKind> {
    let tag = tag.trim();
    if let Some(d) = BACKENDS.iter().find(|d| d.tag().eq_ignore_ascii_case(tag)) {
        return Ok(d.kind);
    }
    BackendKind::from_str(tag)
}

/// An explicitly constructed client for one backend
pub enum BackendClient {
    /// Shared AWS configuration, used for Secrets Manager and Parameter Store
    Aws {
        config: SdkConfig,
        endpoint: Option<String>,
    },
    Gcp(GcpSecretStore),
    Azure(AzureKeyVaultStore),
    /// Any prebuilt opaque-blob store
    Blob(Box<dyn BlobStore>),
    Kubernetes(Box<dyn SecretObjectApi>),
    Vault(Box<dyn VaultKv>),
}

impl BackendClient {
    fn name(&self) -> String {
        match self {
            BackendClient::Aws { .. } => "AWS".to_string(),
            BackendClient::Gcp(_) => "GCP".to_string(),
            BackendClient::Azure(_) => "Azure".to_string(),
            BackendClient::Blob(store) => format!("{} store", store.backend()),
            BackendClient::Kubernetes(_) => "Kubernetes".to_string(),
            BackendClient::Vault(_) => "Vault".to_string(),
        }
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BackendClient({})", self.name())
    }
}

/// Build the adapter for `kind` around `client`
pub fn create_secret_manager(
    kind: BackendKind,
    client: BackendClient,
) -> Result<Box<dyn SecretManager>> {
    debug!("Creating {} secret manager", kind);
    match (kind, client) {
        (BackendKind::AwsSecretsManager, BackendClient::Aws { config, endpoint }) => Ok(Box::new(
            BlobSecretManager::new(SecretsManagerStore::new(config, endpoint)),
        )),
        (BackendKind::AwsParameterStore, BackendClient::Aws { config, endpoint }) => Ok(Box::new(
            BlobSecretManager::new(ParameterStore::new(config, endpoint)),
        )),
        (BackendKind::GcpSecretManager, BackendClient::Gcp(store)) => {
            Ok(Box::new(BlobSecretManager::new(store)))
        }
        (BackendKind::AzureKeyVault, BackendClient::Azure(store)) => {
            Ok(Box::new(BlobSecretManager::new(store)))
        }
        (kind, BackendClient::Blob(store)) if !kind.is_key_value() && store.backend() == kind => {
            Ok(Box::new(BlobSecretManager::new(store)))
        }
        (BackendKind::Kubernetes, BackendClient::Kubernetes(api)) => {
            Ok(Box::new(KubernetesSecretManager::new(api)))
        }
        (BackendKind::Vault, BackendClient::Vault(kv)) => Ok(Box::new(VaultSecretManager::new(kv))),
        (kind, client) => Err(Error::invalid_config(format!(
            "{} client cannot be used for backend '{}'",
            client.name(),
            kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlobStore, MemorySecretObjectApi, MemoryVaultKv};
    use coffer_core::ErrorKind;

    #[test]
    fn test_table_covers_every_backend() {
        assert_eq!(BACKENDS.len(), BackendKind::ALL.len());
        for kind in BackendKind::ALL {
            let d = descriptor(kind).unwrap();
            assert_eq!(d.kind, kind);
            assert_eq!(d.tag(), kind.tag());
            assert_eq!(lookup(d.tag()).unwrap(), kind);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("asm").unwrap(), BackendKind::AwsSecretsManager);
        assert_eq!(lookup(" Vault ").unwrap(), BackendKind::Vault);
        assert_eq!(lookup("k8s").unwrap(), BackendKind::Kubernetes);
        let err = lookup("keepass").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedBackend);
    }

    #[test]
    fn test_create_from_matching_clients() {
        let manager = create_secret_manager(
            BackendKind::Kubernetes,
            BackendClient::Kubernetes(Box::new(MemorySecretObjectApi::new())),
        )
        .unwrap();
        assert_eq!(manager.backend(), BackendKind::Kubernetes);

        let manager = create_secret_manager(
            BackendKind::Vault,
            BackendClient::Vault(Box::new(MemoryVaultKv::new())),
        )
        .unwrap();
        assert_eq!(manager.backend(), BackendKind::Vault);

        let manager = create_secret_manager(
            BackendKind::AwsParameterStore,
            BackendClient::Blob(Box::new(MemoryBlobStore::new(
                BackendKind::AwsParameterStore,
            ))),
        )
        .unwrap();
        assert_eq!(manager.backend(), BackendKind::AwsParameterStore);
    }

    #[test]
    fn test_mismatched_client_is_config_error() {
        let err = create_secret_manager(
            BackendKind::Vault,
            BackendClient::Kubernetes(Box::new(MemorySecretObjectApi::new())),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = create_secret_manager(
            BackendKind::GcpSecretManager,
            BackendClient::Blob(Box::new(MemoryBlobStore::new(
                BackendKind::AwsSecretsManager,
            ))),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
