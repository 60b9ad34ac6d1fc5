//! AWS Systems Manager Parameter Store primitives

use super::classify;
use crate::protocol::{BlobStore, StoredBlob};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::config::Region;
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;
use coffer_core::{BackendKind, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Parameter Store store; parameters are written as `SecureString`
pub struct ParameterStore {
    sdk_config: SdkConfig,
    endpoint: Option<String>,
    clients: Mutex<HashMap<String, Client>>,
}

impl ParameterStore {
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
                let mut builder = aws_sdk_ssm::config::Builder::from(&self.sdk_config);
                if !region.is_empty() {
                    builder = builder.region(Region::new(region.to_string()));
                }
                if let Some(endpoint_url) = &self.endpoint {
                    debug!("Using custom SSM endpoint: {}", endpoint_url);
                    builder = builder.endpoint_url(endpoint_url);
                }
                Client::from_conf(builder.build())
            })
            .clone()
    }
}

#[async_trait]
impl BlobStore for ParameterStore {
    fn backend(&self) -> BackendKind {
        BackendKind::AwsParameterStore
    }

    async fn create(&self, location: &str, name: &str, initial: &str) -> Result<()> {
        self.client(location)
            .await
            .put_parameter()
            .name(name)
            .value(initial)
            .r#type(ParameterType::SecureString)
            .overwrite(false)
            .send()
            .await
            .map_err(|e| classify(&e, "PutParameter"))?;
        Ok(())
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        let output = self
            .client(location)
            .await
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| classify(&e, "GetParameter"))?;

        let parameter = output.parameter();
        let handle = parameter.and_then(|p| p.name()).unwrap_or(name);
        let payload = parameter.and_then(|p| p.value()).map(str::to_string);
        Ok(StoredBlob::new(handle, payload))
    }

    async fn put(&self, location: &str, handle: &str, payload: &str) -> Result<()> {
        self.client(location)
            .await
            .put_parameter()
            .name(handle)
            .value(payload)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| classify(&e, "PutParameter"))?;
        Ok(())
    }
}
