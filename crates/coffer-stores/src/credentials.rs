//! Building backend clients from configuration and the environment

use crate::azure::AzureKeyVaultStore;
use crate::factory::BackendClient;
use crate::gcp::GcpSecretStore;
use crate::kubernetes::{KubeConnection, RestSecretApi};
use crate::vault::{VaultConnection, VaultrsKv};
use aws_config::BehaviorVersion;
use coffer_core::config::KubernetesSettings;
use coffer_core::{BackendKind, CofferConfig, Error, Result, SecureString};
use tracing::debug;

/// Read a required credential from the environment
fn env_token(var: &str) -> Result<SecureString> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecureString::new(value.trim().to_string())),
        _ => Err(Error::invalid_config(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| Error::invalid_config(format!("HTTP client: {}", e)))
}

/// Resolve the Kubernetes API server connection.
///
/// An explicit `api_server` wins, then an explicit kubeconfig, then the
/// in-cluster service account, then `~/.kube/config`.
pub fn kube_connection(settings: &KubernetesSettings) -> Result<KubeConnection> {
    if let Some(server) = &settings.api_server {
        let token = settings.token_env.as_deref().map(env_token).transpose()?;
        let ca_pem = match &settings.ca_cert {
            Some(path) => Some(std::fs::read(path)?),
            None => None,
        };
        return Ok(KubeConnection {
            server: server.clone(),
            token,
            ca_pem,
            identity_pem: None,
            skip_verify: settings.skip_verify,
        });
    }

    if let Some(path) = &settings.kubeconfig {
        return KubeConnection::from_kubeconfig(path);
    }

    match KubeConnection::in_cluster() {
        Ok(connection) => Ok(connection),
        Err(in_cluster) => {
            debug!("Not running in a cluster: {}", in_cluster);
            let path = KubeConnection::default_kubeconfig_path().ok_or_else(|| {
                Error::invalid_config("Unable to configure Kubernetes client: no home directory")
            })?;
            KubeConnection::from_kubeconfig(&path)
        }
    }
}

/// Build the client for `kind` from `config`
pub async fn connect(kind: BackendKind, config: &CofferConfig) -> Result<BackendClient> {
    let settings = config.inner();
    debug!("Connecting to {}", kind);

    match kind {
        BackendKind::AwsSecretsManager | BackendKind::AwsParameterStore => {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            Ok(BackendClient::Aws {
                config: sdk_config,
                endpoint: settings.aws.endpoint.clone(),
            })
        }
        BackendKind::GcpSecretManager => Ok(BackendClient::Gcp(GcpSecretStore::new(
            http_client()?,
            settings.gcp.endpoint.clone(),
            env_token(&settings.gcp.token_env)?,
        ))),
        BackendKind::AzureKeyVault => Ok(BackendClient::Azure(AzureKeyVaultStore::new(
            http_client()?,
            settings.azure.vault_suffix.clone(),
            settings.azure.api_version.clone(),
            env_token(&settings.azure.token_env)?,
        ))),
        BackendKind::Kubernetes => {
            let connection = kube_connection(&settings.kubernetes)?;
            Ok(BackendClient::Kubernetes(Box::new(RestSecretApi::new(
                connection,
            )?)))
        }
        BackendKind::Vault => {
            let vault = &settings.vault;
            Ok(BackendClient::Vault(Box::new(VaultrsKv::new(VaultConnection {
                default_address: vault.address.clone(),
                token: env_token(&vault.token_env)?,
                namespace: vault.namespace.clone(),
                mount: vault.mount.clone(),
                ca_cert: vault.ca_cert.clone(),
                skip_verify: vault.skip_verify,
            }))))
        }
    }
}
