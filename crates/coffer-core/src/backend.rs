//! Backend tags

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The secret backends Coffer can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendKind {
    /// AWS Secrets Manager (location = region)
    AwsSecretsManager,
    /// AWS Systems Manager Parameter Store (location = region)
    AwsParameterStore,
    /// Google Cloud Secret Manager (location = project id)
    GcpSecretManager,
    /// Azure Key Vault (location = key vault name or URL)
    AzureKeyVault,
    /// Kubernetes Secret objects (location = namespace)
    Kubernetes,
    /// HashiCorp Vault KV v2 (location = vault address)
    Vault,
}

impl BackendKind {
    /// Every supported backend, in display order
    pub const ALL: [BackendKind; 6] = [
        BackendKind::AwsSecretsManager,
        BackendKind::AwsParameterStore,
        BackendKind::GcpSecretManager,
        BackendKind::AzureKeyVault,
        BackendKind::Kubernetes,
        BackendKind::Vault,
    ];

    /// Canonical tag used in configuration and on the command line
    pub fn tag(&self) -> &'static str {
        match self {
            BackendKind::AwsSecretsManager => "asm",
            BackendKind::AwsParameterStore => "ssm",
            BackendKind::GcpSecretManager => "gcp",
            BackendKind::AzureKeyVault => "azure",
            BackendKind::Kubernetes => "kubernetes",
            BackendKind::Vault => "vault",
        }
    }

    /// What the location argument means for this backend
    pub fn location_hint(&self) -> &'static str {
        match self {
            BackendKind::AwsSecretsManager | BackendKind::AwsParameterStore => "AWS region",
            BackendKind::GcpSecretManager => "GCP project id",
            BackendKind::AzureKeyVault => "key vault name or URL",
            BackendKind::Kubernetes => "namespace",
            BackendKind::Vault => "vault address",
        }
    }

    /// Whether the backend stores secrets as a native key/value map
    pub fn is_key_value(&self) -> bool {
        matches!(self, BackendKind::Kubernetes | BackendKind::Vault)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asm" | "aws-secrets-manager" | "awssecretsmanager" => {
                Ok(BackendKind::AwsSecretsManager)
            }
            "ssm" | "aws-parameter-store" | "awsparameterstore" => {
                Ok(BackendKind::AwsParameterStore)
            }
            "gcp" | "gcpsm" | "google" => Ok(BackendKind::GcpSecretManager),
            "azure" | "azurekv" | "azure-key-vault" => Ok(BackendKind::AzureKeyVault),
            "kubernetes" | "k8s" | "local" => Ok(BackendKind::Kubernetes),
            "vault" | "hashicorp-vault" => Ok(BackendKind::Vault),
            _ => Err(Error::unsupported_backend(s)),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendKind> for String {
    fn from(kind: BackendKind) -> Self {
        kind.tag().to_string()
    }
}
