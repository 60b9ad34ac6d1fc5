//! AWS Secrets Manager primitives

use super::classify;
use crate::protocol::{BlobStore, StoredBlob};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::Client;
use coffer_core::{BackendKind, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Secrets Manager store; the update handle is the secret's ARN
pub struct SecretsManagerStore {
    sdk_config: SdkConfig,
    endpoint: Option<String>,
    clients: Mutex<HashMap<String, Client>>,
}

impl SecretsManagerStore {
    pub fn new(sdk_config: SdkConfig, endpoint: Option<String>) -> Self {
        Self {
            sdk_config,
            endpoint,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, region: &str) -> Client {
        let mut clients = self.clients.lock().await;
        clients
            .entry(region.to_string())
            .or_insert_with(|| {
                let mut builder = aws_sdk_secretsmanager::config::Builder::from(&self.sdk_config);
                if !region.is_empty() {
                    builder = builder.region(Region::new(region.to_string()));
                }
                if let Some(endpoint_url) = &self.endpoint {
                    debug!("Using custom Secrets Manager endpoint: {}", endpoint_url);
                    builder = builder.endpoint_url(endpoint_url);
                }
                Client::from_conf(builder.build())
            })
            .clone()
    }
}

#[async_trait]
impl BlobStore for SecretsManagerStore {
    fn backend(&self) -> BackendKind {
        BackendKind::AwsSecretsManager
    }

    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()> {
        self.client(location)
            .await
            .create_secret()
            .name(name)
            .secret_string(initial)
            .send()
            .await
            .map_err(|e| classify(&e, "CreateSecret"))?;
        Ok(())
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        let output = self
            .client(location)
            .await
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| classify(&e, "GetSecretValue"))?;

        let payload = match output.secret_string() {
            Some(s) => Some(s.to_string()),
            None => output
                .secret_binary()
                .map(|b| String::from_utf8_lossy(b.as_ref()).into_owned()),
        };
        let handle = output.arn().unwrap_or(name);
        Ok(StoredBlob::new(handle, payload))
    }

    async fn put(&self, location: &str, handle: &str, payload: &str) -> Result<()> {
        self.client(location)
            .await
            .put_secret_value()
            .secret_id(handle)
            .secret_string(payload)
            .send()
            .await
            .map_err(|e| classify(&e, "PutSecretValue"))?;
        Ok(())
    }
}
