//! `SecretObjectApi` over the Kubernetes REST API

use super::kubeconfig::KubeConnection;
use super::object::SecretObject;
use super::SecretObjectApi;
use crate::http::{self, Intent};
use async_trait::async_trait;
use coffer_core::{Error, Result, SecureString};
use reqwest::{Certificate, Client, Identity, RequestBuilder};
use tracing::warn;

/// Secrets API client for one API server
pub struct RestSecretApi {
    client: Client,
    server: String,
    token: Option<SecureString>,
}

impl RestSecretApi {
    pub fn new(connection: KubeConnection) -> Result<Self> {
        let mut builder = Client::builder();

        if let Some(ca) = &connection.ca_pem {
            for cert in Certificate::from_pem_bundle(ca)
                .map_err(|e| Error::invalid_config(format!("Kubernetes CA bundle: {}", e)))?
            {
                builder = builder.add_root_certificate(cert);
            }
        }

        if let Some(pem) = &connection.identity_pem {
            let identity = Identity::from_pem(pem.as_str().as_bytes())
                .map_err(|e| Error::invalid_config(format!("Kubernetes client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }

        if connection.skip_verify {
            warn!("TLS verification disabled for {}", connection.server);
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| Error::invalid_config(format!("Kubernetes HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server: connection.server.trim_end_matches('/').to_string(),
            token: connection.token,
        })
    }

    fn collection_url(&self, namespace: &str) -> String {
        format!("{}/api/v1/namespaces/{}/secrets", self.server, namespace)
    }

    fn object_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_url(namespace), name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", http::bearer(token)),
            None => request,
        }
    }

    async fn exchange(
        &self,
        request: RequestBuilder,
        intent: Intent,
        what: &str,
    ) -> Result<SecretObject> {
        let request = self.authorize(request.header("Accept", "application/json"));
        let response = http::check(http::send(request, what).await?, intent, what).await?;
        http::json(response, what).await
    }
}

#[async_trait]
impl SecretObjectApi for RestSecretApi {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretObject> {
        let what = format!("get Secret {}/{}", namespace, name);
        self.exchange(
            self.client.get(self.object_url(namespace, name)),
            Intent::Read,
            &what,
        )
            .await
    }

    async fn create(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        let what = format!("create Secret {}/{}", namespace, object.name());
        self.exchange(
            self.client.post(self.collection_url(namespace)).json(object),
            Intent::Create,
            &what,
        )
        .await
    }

    async fn update(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        let what = format!("update Secret {}/{}", namespace, object.name());
        self.exchange(
            self.client
                .put(self.object_url(namespace, object.name()))
                .json(object),
            Intent::Update,
            &what,
        )
        .await
    }
}
