//! Kubernetes Secrets adapter
//!
//! The location of a secret is its namespace. Secrets are native key/value
//! objects, so a write overlays properties onto the object's `data` instead
//! of going through get-merge-set. Writes can fan out to other namespaces via
//! the replicate-to annotation.

mod client;
mod kubeconfig;
mod object;
mod replication;

pub use client::RestSecretApi;
pub use kubeconfig::KubeConnection;
pub use object::{ObjectMeta, SecretObject};
pub use replication::{replicate, replication_targets};

use async_trait::async_trait;
use coffer_core::contract::property_key;
use coffer_core::{
    BackendKind, Error, Result, SecretContext, SecretManager, SecretValue, REPLICATE_TO_ANNOTATION,
    SECRET_TYPE_OPAQUE,
};
use tracing::debug;

/// Get, create and update of `v1/Secret` objects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretObjectApi: Send + Sync {
    /// Fetch a Secret; `NotFound` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretObject>;

    async fn create(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject>;

    async fn update(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject>;
}

#[async_trait]
impl<T: SecretObjectApi + ?Sized> SecretObjectApi for Box<T> {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretObject> {
        (**self).get(namespace, name).await
    }

    async fn create(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        (**self).create(namespace, object).await
    }

    async fn update(&self, namespace: &str, object: &SecretObject) -> Result<SecretObject> {
        (**self).update(namespace, object).await
    }
}

/// `SecretManager` for Kubernetes Secrets
pub struct KubernetesSecretManager<A> {
    api: A,
}

impl<A: SecretObjectApi> KubernetesSecretManager<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn read(&self, namespace: &str, name: &str, property: Option<&str>) -> Result<String> {
        let object = self.api.get(namespace, name).await?;
        match property_key(property) {
            None => Ok(serde_json::to_string(&object.property_map()?)?),
            Some(key) => object
                .lookup(key)?
                .ok_or_else(|| Error::not_found(format!("key '{}' in Secret {}", key, name))),
        }
    }

    /// Apply `value` to the Secret, creating it when absent
    async fn write(&self, namespace: &str, name: &str, value: &SecretValue) -> Result<SecretObject> {
        let existing = match self.api.get(namespace, name).await {
            Ok(object) => Some(object),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let create = existing.is_none();
        let mut object = existing.unwrap_or_else(|| SecretObject::new(namespace, name));

        let content = value.key_value_content()?;
        // The type of an existing Secret is immutable unless explicitly requested
        object.secret_type = value
            .secret_type
            .clone()
            .or_else(|| object.secret_type.take())
            .filter(|t| !t.is_empty())
            .or_else(|| Some(SECRET_TYPE_OPAQUE.to_string()));
        if value.overwrite {
            object.data.clear();
            object.string_data.clear();
        }
        for (key, val) in content {
            object.data.insert(key, val.into_bytes());
        }
        object.metadata.labels.extend(value.labels.clone());
        object
            .metadata
            .annotations
            .extend(value.annotations.clone());

        debug!(
            "kubernetes: {} Secret {}/{} ({} keys)",
            if create { "creating" } else { "updating" },
            namespace,
            name,
            object.data.len()
        );
        if create {
            self.api.create(namespace, &object).await
        } else {
            self.api.update(namespace, &object).await
        }
    }
}

#[async_trait]
impl<A: SecretObjectApi> SecretManager for KubernetesSecretManager<A> {
    fn backend(&self) -> BackendKind {
        BackendKind::Kubernetes
    }

    async fn get_secret(
        &self,
        location: &str,
        name: &str,
        property: Option<&str>,
    ) -> Result<String> {
        self.read(location, name, property)
            .await
            .secret_context(BackendKind::Kubernetes, "read", location, name)
    }

    async fn set_secret(&self, location: &str, name: &str, value: &SecretValue) -> Result<()> {
        let written = self
            .write(location, name, value)
            .await
            .secret_context(BackendKind::Kubernetes, "write", location, name)?;

        let targets = replication_targets(
            value
                .annotations
                .get(REPLICATE_TO_ANNOTATION)
                .map(String::as_str),
            location,
        );
        replicate(&self.api, &written, &targets).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::ErrorKind;
    use mockall::predicate::*;
    use mockall::Sequence;

    fn secret(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> SecretObject {
        let mut object = SecretObject::new(namespace, name);
        object.secret_type = Some(SECRET_TYPE_OPAQUE.to_string());
        object.metadata.resource_version = Some("1".to_string());
        for (k, v) in pairs {
            object.data.insert(k.to_string(), v.as_bytes().to_vec());
        }
        object
    }

    #[tokio::test]
    async fn test_get_key_from_data_then_string_data() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get().with(eq("ns-a"), eq("db")).returning(|_, _| {
            let mut object = secret("ns-a", "db", &[("user", "admin")]);
            object
                .string_data
                .insert("host".to_string(), "db.local".to_string());
            Ok(object)
        });

        let manager = KubernetesSecretManager::new(api);
        assert_eq!(manager.get_secret("ns-a", "db", Some("user")).await.unwrap(), "admin");
        assert_eq!(
            manager.get_secret("ns-a", "db", Some("host")).await.unwrap(),
            "db.local"
        );
        let err = manager
            .get_secret("ns-a", "db", Some("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let whole = manager.get_secret("ns-a", "db", None).await.unwrap();
        assert_eq!(whole, r#"{"host":"db.local","user":"admin"}"#);
    }

    #[tokio::test]
    async fn test_set_creates_missing_secret_as_opaque() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .returning(|_, name| Err(Error::not_found(name.to_string())));
        api.expect_update().never();
        api.expect_create()
            .withf(|ns, object| {
                ns == "ns-a"
                    && object.secret_type.as_deref() == Some("Opaque")
                    && object.data.get("token").map(Vec::as_slice) == Some(&b"abc"[..])
                    && object.metadata.labels.get("app").map(String::as_str) == Some("api")
            })
            .times(1)
            .returning(|_, object| Ok(object.clone()));

        let manager = KubernetesSecretManager::new(api);
        let value = SecretValue::from_properties([("token", "abc")]).with_label("app", "api");
        manager.set_secret("ns-a", "api", &value).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_overlays_existing_data() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .returning(|_, _| Ok(secret("ns-a", "db", &[("user", "admin")])));
        api.expect_update()
            .withf(|_, object| {
                object.data.len() == 2
                    && object.data.get("user").map(Vec::as_slice) == Some(&b"admin"[..])
                    && object.data.get("password").map(Vec::as_slice) == Some(&b"pw"[..])
                    && object.metadata.resource_version.as_deref() == Some("1")
                    && object.secret_type.as_deref() == Some("kubernetes.io/basic-auth")
            })
            .times(1)
            .returning(|_, object| Ok(object.clone()));

        let manager = KubernetesSecretManager::new(api);
        let value = SecretValue::from_properties([("password", "pw")])
            .with_type("kubernetes.io/basic-auth");
        manager.set_secret("ns-a", "db", &value).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_overwrite_replaces_data() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .returning(|_, _| Ok(secret("ns-a", "db", &[("user", "admin")])));
        api.expect_update()
            .withf(|_, object| object.data.len() == 1 && object.data.contains_key("password"))
            .times(1)
            .returning(|_, object| Ok(object.clone()));

        let manager = KubernetesSecretManager::new(api);
        let value = SecretValue::from_properties([("password", "pw")]).with_overwrite(true);
        manager.set_secret("ns-a", "db", &value).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_flat_value_must_be_a_map() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .returning(|_, _| Ok(secret("ns-a", "db", &[])));
        api.expect_update().never();
        api.expect_create().never();

        let manager = KubernetesSecretManager::new(api);
        let err = manager
            .set_secret("ns-a", "db", &SecretValue::flat("not a map"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_set_metadata_only_keeps_data_and_type() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get().returning(|_, _| {
            let mut object = secret("ns-a", "tls", &[("tls.crt", "cert")]);
            object.secret_type = Some("kubernetes.io/tls".to_string());
            Ok(object)
        });
        api.expect_update()
            .withf(|_, object| {
                object.data.len() == 1
                    && object.secret_type.as_deref() == Some("kubernetes.io/tls")
                    && object.metadata.labels.get("team").map(String::as_str) == Some("a")
            })
            .times(1)
            .returning(|_, object| Ok(object.clone()));

        let manager = KubernetesSecretManager::new(api);
        let value = SecretValue::default().with_label("team", "a");
        manager.set_secret("ns-a", "tls", &value).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_failure_other_than_not_found_aborts() {
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .returning(|_, _| Err(Error::access_denied("forbidden")));
        api.expect_create().never();
        api.expect_update().never();

        let manager = KubernetesSecretManager::new(api);
        let err = manager
            .set_secret("ns-a", "db", &SecretValue::from_properties([("k", "v")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_replication_stops_at_first_failure() {
        let mut seq = Sequence::new();
        let mut api = MockSecretObjectApi::new();
        api.expect_get()
            .with(eq("ns-a"), eq("db"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, name| Err(Error::not_found(name.to_string())));
        api.expect_create()
            .withf(|ns, _| ns == "ns-a")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, object| Ok(object.clone()));
        api.expect_get()
            .with(eq("ns-b"), eq("db"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, name| Err(Error::not_found(name.to_string())));
        api.expect_create()
            .withf(|ns, object| {
                ns == "ns-b" && object.metadata.namespace.as_deref() == Some("ns-b")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, object| Ok(object.clone()));
        api.expect_get()
            .with(eq("ns-c"), eq("db"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(Error::access_denied("namespace ns-c is forbidden")));

        let manager = KubernetesSecretManager::new(api);
        let value = SecretValue::from_properties([("x", "1")])
            .with_annotation(REPLICATE_TO_ANNOTATION, "ns-b,ns-c,ns-d");
        let err = manager.set_secret("ns-a", "db", &value).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert!(err.to_string().contains("ns-c"), "{}", err);
    }
}
