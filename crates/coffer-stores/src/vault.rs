//! HashiCorp Vault KV v2 adapter
//!
//! Vault stores a map natively, so writes overlay properties onto the stored
//! data instead of re-encoding a blob. The location of a secret is the Vault
//! address; an empty location uses the configured default address.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use coffer_core::contract::property_key;
use coffer_core::{
    BackendKind, Error, Result, SecretContext, SecretManager, SecretValue, SecureString,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

/// Data map of a KV v2 secret
pub type KvData = Map<String, Value>;

/// Native read/write of KV v2 data maps
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultKv: Send + Sync {
    /// Read the latest version; `None` when the secret does not exist
    async fn read(&self, location: &str, path: &str) -> Result<Option<KvData>>;

    /// Write a new version holding exactly `data`
    async fn write(&self, location: &str, path: &str, data: &KvData) -> Result<()>;
}

#[async_trait]
impl<T: VaultKv + ?Sized> VaultKv for Box<T> {
    async fn read(&self, location: &str, path: &str) -> Result<Option<KvData>> {
        (**self).read(location, path).await
    }

    async fn write(&self, location: &str, path: &str, data: &KvData) -> Result<()> {
        (**self).write(location, path, data).await
    }
}

/// Connection settings for the vaultrs client
#[derive(Debug, Clone)]
pub struct VaultConnection {
    /// Address used when a secret's location is empty
    pub default_address: Option<String>,
    pub token: SecureString,
    pub namespace: Option<String>,
    pub mount: String,
    pub ca_cert: Option<Utf8PathBuf>,
    pub skip_verify: bool,
}

/// `VaultKv` over the vaultrs client, one client per address
pub struct VaultrsKv {
    connection: VaultConnection,
    clients: Mutex<HashMap<String, Arc<VaultClient>>>,
}

impl VaultrsKv {
    pub fn new(connection: VaultConnection) -> Self {
        Self {
            connection,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn address<'a>(&'a self, location: &'a str) -> Result<&'a str> {
        if !location.is_empty() {
            return Ok(location);
        }
        self.connection.default_address.as_deref().ok_or_else(|| {
            Error::invalid_config("No Vault address: pass a location or set VAULT_ADDR")
        })
    }

    fn create_client(&self, address: &str) -> Result<VaultClient> {
        let mut settings = VaultClientSettingsBuilder::default();
        settings.address(address);
        settings.token(self.connection.token.as_str());

        if let Some(ns) = &self.connection.namespace {
            settings.namespace(Some(ns.clone()));
        }

        if let Some(ca) = &self.connection.ca_cert {
            settings.ca_certs(vec![ca.to_string()]);
        }

        if self.connection.skip_verify {
            warn!("TLS verification disabled");
            settings.verify(false);
        }

        let settings = settings
            .build()
            .map_err(|e| Error::invalid_config(format!("Vault client settings: {}", e)))?;
        VaultClient::new(settings)
            .map_err(|e| Error::invalid_config(format!("Vault client: {}", e)))
    }

    async fn client(&self, location: &str) -> Result<Arc<VaultClient>> {
        let address = self.address(location)?;
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(address) {
            return Ok(Arc::clone(client));
        }
        debug!("Creating Vault client for {}", address);
        let client = Arc::new(self.create_client(address)?);
        clients.insert(address.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

/// Normalize a vaultrs error
fn classify(err: ClientError, what: &str) -> Error {
    match &err {
        ClientError::APIError { code: 404, .. } => Error::not_found(format!("{}: {}", what, err)),
        ClientError::APIError {
            code: 401 | 403, ..
        } => Error::access_denied(format!("{}: {}", what, err)),
        _ => Error::transport(format!("{}: {}", what, err)),
    }
}

#[async_trait]
impl VaultKv for VaultrsKv {
    async fn read(&self, location: &str, path: &str) -> Result<Option<KvData>> {
        let client = self.client(location).await?;
        match kv2::read::<KvData>(&*client, &self.connection.mount, path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                let err = classify(e, &format!("read {}", path));
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn write(&self, location: &str, path: &str, data: &KvData) -> Result<()> {
        let client = self.client(location).await?;
        kv2::set(&*client, &self.connection.mount, path, data)
            .await
            .map_err(|e| classify(e, &format!("write {}", path)))?;
        Ok(())
    }
}

/// `SecretManager` for Vault KV v2
pub struct VaultSecretManager<K> {
    kv: K,
}

impl<K: VaultKv> VaultSecretManager<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    async fn read(&self, location: &str, name: &str, property: Option<&str>) -> Result<String> {
        let data = self
            .kv
            .read(location, name)
            .await?
            .ok_or_else(|| Error::not_found(name.to_string()))?;

        let Some(key) = property_key(property) else {
            return Ok(serde_json::to_string(&data)?);
        };
        match data.get(key) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::malformed(format!(
                "value of '{}' is not a string",
                key
            ))),
        }
    }

    async fn write(&self, location: &str, name: &str, value: &SecretValue) -> Result<()> {
        let content = value.key_value_content()?;
        if content.is_empty() && !value.overwrite {
            // KV v2 has no labels or annotations to update
            debug!("vault: nothing to write for '{}'", name);
            return Ok(());
        }
        let mut data = if value.overwrite {
            KvData::new()
        } else {
            self.kv.read(location, name).await?.unwrap_or_default()
        };
        debug!(
            "vault: writing '{}' ({} existing keys, {} new)",
            name,
            data.len(),
            content.len()
        );
        for (key, val) in content {
            data.insert(key, Value::String(val));
        }
        self.kv.write(location, name, &data).await
    }
}

#[async_trait]
impl<K: VaultKv> SecretManager for VaultSecretManager<K> {
    fn backend(&self) -> BackendKind {
        BackendKind::Vault
    }

    async fn get_secret(
        &self,
        location: &str,
        name: &str,
        property: Option<&str>,
    ) -> Result<String> {
        self.read(location, name, property)
            .await
            .secret_context(BackendKind::Vault, "read", location, name)
    }

    async fn set_secret(&self, location: &str, name: &str, value: &SecretValue) -> Result<()> {
        self.write(location, name, value)
            .await
            .secret_context(BackendKind::Vault, "write", location, name)
    }
}
