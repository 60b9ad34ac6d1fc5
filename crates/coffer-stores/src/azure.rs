//! Azure Key Vault primitives (REST)
//!
//! The location of a secret is the vault name, or the full vault URL.
//! Key Vault has no separate create call, so create is a read followed by a
//! write when the secret is absent.

use crate::http::{self, Intent};
use crate::protocol::{BlobStore, StoredBlob};
use async_trait::async_trait;
use coffer_core::{BackendKind, Error, Result, SecureString};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub struct AzureKeyVaultStore {
    client: Client,
    vault_suffix: String,
    api_version: String,
    token: SecureString,
}

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: Option<String>,
}

impl AzureKeyVaultStore {
    pub fn new(
        client: Client,
        vault_suffix: impl Into<String>,
        api_version: impl Into<String>,
        token: SecureString,
    ) -> Self {
        Self {
            client,
            vault_suffix: vault_suffix.into(),
            api_version: api_version.into(),
            token,
        }
    }

    fn vault_url(&self, location: &str) -> String {
        if location.starts_with("https://") || location.starts_with("http://") {
            location.trim_end_matches('/').to_string()
        } else {
            format!("https://{}.{}", location, self.vault_suffix)
        }
    }

    fn secret_url(&self, location: &str, name: &str) -> String {
        format!("{}/secrets/{}", self.vault_url(location), name)
    }

    fn versioned(&self, url: &str) -> String {
        format!("{}?api-version={}", url, self.api_version)
    }

    async fn get_bundle(&self, url: &str, what: &str) -> Result<SecretBundle> {
        let request = self
            .client
            .get(self.versioned(url))
            .header("Authorization", http::bearer(&self.token));
        let response = http::send(request, what).await?;
        let response = http::check(response, Intent::Read, what).await?;
        http::json(response, what).await
    }

    async fn put_value(&self, url: &str, value: &str, intent: Intent, what: &str) -> Result<()> {
        let request = self
            .client
            .put(self.versioned(url))
            .header("Authorization", http::bearer(&self.token))
            .json(&json!({ "value": value }));
        http::check(http::send(request, what).await?, intent, what).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for AzureKeyVaultStore {
    fn backend(&self) -> BackendKind {
        BackendKind::AzureKeyVault
    }

    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()> {
        let url = self.secret_url(location, name);
        match self.get_bundle(&url, &format!("get secret {}", name)).await {
            Ok(_) => Err(Error::already_exists(format!("secret {}", name))),
            Err(e) if e.is_not_found() => {
                let what = format!("create secret {}", name);
                self.put_value(&url, initial, Intent::Create, &what).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        let url = self.secret_url(location, name);
        let bundle = self.get_bundle(&url, &format!("get secret {}", name)).await?;
        Ok(StoredBlob::new(url, bundle.value))
    }

    async fn put(&self, _location: &str, handle: &str, payload: &str) -> Result<()> {
        let what = format!("set secret {}", handle);
        self.put_value(handle, payload, Intent::Update, &what).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AzureKeyVaultStore {
        AzureKeyVaultStore::new(
            Client::new(),
            "vault.azure.net",
            "7.4",
            SecureString::from("eyJ0eXAi"),
        )
    }

    #[test]
    fn test_secret_url_from_vault_name() {
        let store = store();
        assert_eq!(
            store.versioned(&store.secret_url("my-vault", "db-password")),
            "https://my-vault.vault.azure.net/secrets/db-password?api-version=7.4"
        );
    }

    #[test]
    fn test_secret_url_from_vault_url() {
        let store = store();
        assert_eq!(
            store.secret_url("https://sovereign.vault.azure.cn/", "api"),
            "https://sovereign.vault.azure.cn/secrets/api"
        );
    }

    #[test]
    fn test_bundle_without_value() {
        let bundle: SecretBundle =
            serde_json::from_str(r#"{"id":"https://v/secrets/x/1","attributes":{}}"#).unwrap();
        assert!(bundle.value.is_none());
    }
}
