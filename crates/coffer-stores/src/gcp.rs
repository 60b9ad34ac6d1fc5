//! Google Cloud Secret Manager primitives (REST v1)
//!
//! The location of a secret is the GCP project ID. Payloads travel base64
//! encoded; a secret container can exist without any version, in which case
//! it has no payload yet.

use crate::http::{self, Intent};
use crate::protocol::{BlobStore, StoredBlob};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use coffer_core::{BackendKind, Error, Result, SecureString};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

pub struct GcpSecretStore {
    client: Client,
    endpoint: String,
    token: SecureString,
}

#[derive(Debug, Deserialize)]
struct SecretResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    payload: Option<AccessPayload>,
}

#[derive(Debug, Deserialize)]
struct AccessPayload {
    data: Option<String>,
}

impl GcpSecretStore {
    pub fn new(client: Client, endpoint: impl Into<String>, token: SecureString) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn secrets_url(&self, project: &str) -> String {
        format!("{}/v1/projects/{}/secrets", self.endpoint, project)
    }

    fn secret_url(&self, project: &str, name: &str) -> String {
        format!("{}/{}", self.secrets_url(project), name)
    }

    fn resource_url(&self, resource: &str, suffix: &str) -> String {
        format!("{}/v1/{}{}", self.endpoint, resource, suffix)
    }
}

/// Decode the base64 payload of an `access` response
fn decode_payload(response: AccessResponse) -> Result<Option<String>> {
    let Some(data) = response.payload.and_then(|p| p.data) else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| Error::malformed(format!("base64 decode failed: {}", e)))?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| Error::malformed(format!("payload is not UTF-8: {}", e)))
}

#[async_trait]
impl BlobStore for GcpSecretStore {
    fn backend(&self) -> BackendKind {
        BackendKind::GcpSecretManager
    }

    async fn create(&self, location: &str, name: &str, _initial: &str) -> Result<()> {
        // The value is written as the first version by the following put
        let request = self
            .client
            .post(format!("{}?secretId={}", self.secrets_url(location), name))
            .header("Authorization", http::bearer(&self.token))
            .json(&json!({ "replication": { "automatic": {} } }));

        let what = format!("create secret {}", name);
        let response = http::send(request, &what).await?;
        http::check(response, Intent::Create, &what).await?;
        Ok(())
    }

    async fn fetch(&self, location: &str, name: &str) -> Result<StoredBlob> {
        let what = format!("get secret {}", name);
        let request = self
            .client
            .get(self.secret_url(location, name))
            .header("Authorization", http::bearer(&self.token));
        let response = http::send(request, &what).await?;
        let response = http::check(response, Intent::Read, &what).await?;
        let secret: SecretResource = http::json(response, &what).await?;

        let what = format!("access latest version of {}", name);
        let request = self
            .client
            .get(self.resource_url(&secret.name, "/versions/latest:access"))
            .header("Authorization", http::bearer(&self.token));
        let response = http::send(request, &what).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(StoredBlob::new(secret.name, None));
        }
        let response = http::check(response, Intent::Read, &what).await?;
        let payload = decode_payload(http::json(response, &what).await?)?;
        Ok(StoredBlob::new(secret.name, payload))
    }

    async fn put(&self, _location: &str, handle: &str, payload: &str) -> Result<()> {
        let what = format!("add version to {}", handle);
        let request = self
            .client
            .post(self.resource_url(handle, ":addVersion"))
            .header("Authorization", http::bearer(&self.token))
            .json(&json!({ "payload": { "data": STANDARD.encode(payload) } }));
        let response = http::send(request, &what).await?;
        http::check(response, Intent::Update, &what).await?;
        Ok(())
    }
}
