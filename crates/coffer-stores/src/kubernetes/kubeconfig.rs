//! API server connection discovery
//!
//! Supports the in-cluster service account and the subset of kubeconfig
//! used by token and client-certificate users. Exec and auth-provider
//! plugins are not run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use camino::{Utf8Path, Utf8PathBuf};
use coffer_core::{Error, Result, SecureString};
use serde::Deserialize;
use tracing::{debug, warn};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Everything needed to build a client for one API server
#[derive(Debug, Clone, Default)]
pub struct KubeConnection {
    pub server: String,
    pub token: Option<SecureString>,
    /// PEM bundle trusted for the API server certificate
    pub ca_pem: Option<Vec<u8>>,
    /// PEM client certificate followed by its private key
    pub identity_pem: Option<SecureString>,
    pub skip_verify: bool,
}

impl KubeConnection {
    /// Connection from the pod's mounted service account
    pub fn in_cluster() -> Result<Self> {
        Self::in_cluster_from(Utf8Path::new(SERVICE_ACCOUNT_DIR))
    }

    fn in_cluster_from(dir: &Utf8Path) -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| Error::invalid_config("KUBERNETES_SERVICE_HOST not set"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let token = std::fs::read_to_string(dir.join("token"))?;
        let ca_pem = std::fs::read(dir.join("ca.crt")).ok();

        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };
        debug!("Using in-cluster Kubernetes configuration");
        Ok(Self {
            server: format!("https://{}:{}", host, port),
            token: Some(SecureString::new(token.trim().to_string())),
            ca_pem,
            identity_pem: None,
            skip_verify: false,
        })
    }

    /// Connection from the current context of a kubeconfig file
    pub fn from_kubeconfig(path: &Utf8Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        let base = path.parent().unwrap_or(Utf8Path::new("."));
        let kubeconfig: Kubeconfig = serde_yaml_ng::from_str(&content)?;
        kubeconfig.connection(base)
    }

    /// `~/.kube/config`
    pub fn default_kubeconfig_path() -> Option<Utf8PathBuf> {
        dirs::home_dir()
            .and_then(|home| Utf8PathBuf::try_from(home).ok())
            .map(|home| home.join(".kube").join("config"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    contexts: Vec<Named<ContextEntry>>,
    #[serde(default)]
    clusters: Vec<Named<ClusterEntry>>,
    #[serde(default)]
    users: Vec<Named<UserEntry>>,
}

#[derive(Debug, Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "context", alias = "cluster", alias = "user")]
    value: T,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<Utf8PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_file: Option<Utf8PathBuf>,
    #[serde(default)]
    client_certificate: Option<Utf8PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<Utf8PathBuf>,
    #[serde(default)]
    client_key_data: Option<String>,
    #[serde(default)]
    exec: Option<serde_yaml_ng::Value>,
}

impl std::fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserEntry")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .field("client_certificate", &self.client_certificate)
            .field("client_key", &self.client_key)
            .finish()
    }
}

fn resolve(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        base.join(path)
    }
}

/// Inline base64 data, or the contents of a file relative to the kubeconfig
fn material(base: &Utf8Path, data: Option<&str>, file: Option<&Utf8Path>) -> Result<Option<Vec<u8>>> {
    if let Some(data) = data {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| Error::invalid_config(format!("kubeconfig: invalid base64: {}", e)))?;
        return Ok(Some(bytes));
    }
    match file {
        Some(path) => Ok(Some(std::fs::read(resolve(base, path))?)),
        None => Ok(None),
    }
}

impl Kubeconfig {
    fn connection(&self, base: &Utf8Path) -> Result<KubeConnection> {
        let context_name = self
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::invalid_config("kubeconfig has no current-context"))?;
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.value)
            .ok_or_else(|| {
                Error::invalid_config(format!("kubeconfig context '{}' not found", context_name))
            })?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.value)
            .ok_or_else(|| {
                Error::invalid_config(format!("kubeconfig cluster '{}' not found", context.cluster))
            })?;
        let anonymous = UserEntry::default();
        let user = match &context.user {
            Some(name) => self
                .users
                .iter()
                .find(|u| &u.name == name)
                .map(|u| &u.value)
                .ok_or_else(|| {
                    Error::invalid_config(format!("kubeconfig user '{}' not found", name))
                })?,
            None => &anonymous,
        };

        let token = match (&user.token, &user.token_file) {
            (Some(token), _) => Some(SecureString::new(token.clone())),
            (None, Some(file)) => Some(SecureString::new(
                std::fs::read_to_string(resolve(base, file))?.trim().to_string(),
            )),
            (None, None) => None,
        };

        let cert = material(
            base,
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
        )?;
        let key = material(base, user.client_key_data.as_deref(), user.client_key.as_deref())?;
        let identity_pem = match (cert, key) {
            (Some(mut cert), Some(key)) => {
                cert.push(b'\n');
                cert.extend(key);
                Some(SecureString::new(String::from_utf8_lossy(&cert).into_owned()))
            }
            _ => None,
        };

        if token.is_none() && identity_pem.is_none() && user.exec.is_some() {
            warn!(
                "kubeconfig user for context '{}' uses an exec plugin, which is not supported; continuing without credentials",
                context_name
            );
        }

        debug!("Using kubeconfig context '{}' ({})", context_name, cluster.server);
        Ok(KubeConnection {
            server: cluster.server.trim_end_matches('/').to_string(),
            token,
            ca_pem: material(
                base,
                cluster.certificate_authority_data.as_deref(),
                cluster.certificate_authority.as_deref(),
            )?,
            identity_pem,
            skip_verify: cluster.insecure_skip_tls_verify,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
      namespace: team-a
  - name: prod
    context:
      cluster: prod-cluster
      user: prod-user
clusters:
  - name: dev-cluster
    cluster:
      server: https://dev.example.com:6443/
      certificate-authority-data: LS0tLS1CRUdJTg==
  - name: prod-cluster
    cluster:
      server: https://prod.example.com
      insecure-skip-tls-verify: true
users:
  - name: dev-user
    user:
      token: dev-token
  - name: prod-user
    user:
      exec:
        command: aws
"#;

    fn write(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_current_context_with_token() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let path = write(&dir, "config", KUBECONFIG);

        let conn = KubeConnection::from_kubeconfig(&path).unwrap();
        assert_eq!(conn.server, "https://dev.example.com:6443");
        assert_eq!(conn.token.as_ref().map(|t| t.as_str()), Some("dev-token"));
        assert_eq!(conn.ca_pem.as_deref(), Some(&b"-----BEGIN"[..]));
        assert!(!conn.skip_verify);
    }

    #[test]
    fn test_exec_user_has_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let path = write(
            &dir,
            "config",
            &KUBECONFIG.replace("current-context: dev", "current-context: prod"),
        );

        let conn = KubeConnection::from_kubeconfig(&path).unwrap();
        assert_eq!(conn.server, "https://prod.example.com");
        assert!(conn.token.is_none());
        assert!(conn.skip_verify);
    }

    #[test]
    fn test_relative_files_resolve_against_kubeconfig() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        write(&dir, "ca.pem", "CA");
        write(&dir, "token", "file-token\n");
        let path = write(
            &dir,
            "config",
            r#"
current-context: local
contexts:
  - name: local
    context:
      cluster: local
      user: local
clusters:
  - name: local
    cluster:
      server: https://127.0.0.1:6443
      certificate-authority: ca.pem
users:
  - name: local
    user:
      token-file: token
"#,
        );

        let conn = KubeConnection::from_kubeconfig(&path).unwrap();
        assert_eq!(conn.ca_pem.as_deref(), Some(&b"CA"[..]));
        assert_eq!(conn.token.as_ref().map(|t| t.as_str()), Some("file-token"));
    }

    #[test]
    fn test_missing_context_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let path = write(
            &dir,
            "config",
            &KUBECONFIG.replace("current-context: dev", "current-context: staging"),
        );

        let err = KubeConnection::from_kubeconfig(&path).unwrap_err();
        assert!(err.to_string().contains("staging"), "{}", err);
    }

    #[test]
    #[serial]
    fn test_in_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        write(&dir, "token", "sa-token\n");
        write(&dir, "ca.crt", "CLUSTER CA");

        std::env::set_var("KUBERNETES_SERVICE_HOST", "10.96.0.1");
        std::env::set_var("KUBERNETES_SERVICE_PORT", "443");
        let conn = KubeConnection::in_cluster_from(&dir);
        std::env::remove_var("KUBERNETES_SERVICE_HOST");
        std::env::remove_var("KUBERNETES_SERVICE_PORT");

        let conn = conn.unwrap();
        assert_eq!(conn.server, "https://10.96.0.1:443");
        assert_eq!(conn.token.as_ref().map(|t| t.as_str()), Some("sa-token"));
        assert_eq!(conn.ca_pem.as_deref(), Some(&b"CLUSTER CA"[..]));
    }

    #[test]
    #[serial]
    fn test_not_in_cluster() {
        std::env::remove_var("KUBERNETES_SERVICE_HOST");
        assert!(KubeConnection::in_cluster().is_err());
    }
}
