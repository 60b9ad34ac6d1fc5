//! Configuration file types

use crate::backend::BackendKind;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Contents of `coffer.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CofferConfigFile {
    /// Default backend when none is given on the command line
    pub backend: Option<BackendKind>,
    /// Default location when none is given on the command line
    pub location: Option<String>,
    pub vault: VaultSettings,
    pub kubernetes: KubernetesSettings,
    pub aws: AwsSettings,
    pub gcp: GcpSettings,
    pub azure: AzureSettings,
}

/// HashiCorp Vault connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Default address, used when the location is empty
    pub address: Option<String>,
    /// Environment variable holding the token
    pub token_env: String,
    pub namespace: Option<String>,
    /// KV v2 mount point
    pub mount: String,
    /// PEM CA bundle for the Vault TLS endpoint
    pub ca_cert: Option<Utf8PathBuf>,
    pub skip_verify: bool,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: None,
            token_env: "VAULT_TOKEN".to_string(),
            namespace: None,
            mount: "secret".to_string(),
            ca_cert: None,
            skip_verify: false,
        }
    }
}

/// Kubernetes API connection settings
///
/// With nothing set, the in-cluster service account is tried first and the
/// current kubeconfig context second.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesSettings {
    pub api_server: Option<String>,
    /// Environment variable holding a bearer token for `api_server`
    pub token_env: Option<String>,
    pub ca_cert: Option<Utf8PathBuf>,
    pub kubeconfig: Option<Utf8PathBuf>,
    pub skip_verify: bool,
}

/// AWS settings; credentials always come from the default provider chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    /// Endpoint override (LocalStack and similar)
    pub endpoint: Option<String>,
}

/// Google Cloud Secret Manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpSettings {
    pub endpoint: String,
    /// Environment variable holding an OAuth2 access token
    pub token_env: String,
}

impl Default for GcpSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://secretmanager.googleapis.com".to_string(),
            token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
        }
    }
}

/// Azure Key Vault settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// DNS suffix appended to the vault name
    pub vault_suffix: String,
    pub api_version: String,
    /// Environment variable holding an Azure AD access token for Key Vault
    pub token_env: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            vault_suffix: "vault.azure.net".to_string(),
            api_version: "7.4".to_string(),
            token_env: "AZURE_KEYVAULT_TOKEN".to_string(),
        }
    }
}
