//! The `v1/Secret` object as exchanged with the API server

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use coffer_core::{Error, PropertyMap, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Object metadata; only the fields Coffer reads or writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "nullable")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "nullable")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// A Kubernetes Secret
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretObject {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    /// Decoded values of the base64 `data` field
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_data",
        deserialize_with = "deserialize_data"
    )]
    pub data: BTreeMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "nullable")]
    pub string_data: BTreeMap<String, String>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Secret".to_string()
}

fn nullable<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn serialize_data<S>(data: &BTreeMap<String, Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded: BTreeMap<&String, String> =
        data.iter().map(|(k, v)| (k, STANDARD.encode(v))).collect();
    encoded.serialize(serializer)
}

fn deserialize_data<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = nullable(deserializer)?;
    encoded
        .into_iter()
        .map(|(k, v)| {
            STANDARD
                .decode(v.as_bytes())
                .map(|bytes| (k, bytes))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

impl SecretObject {
    /// An empty object to be created
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Look a key up in `data`, then in `stringData`
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        if let Some(bytes) = self.data.get(key) {
            return String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|_| Error::malformed(format!("value of '{}' is not UTF-8", key)));
        }
        Ok(self.string_data.get(key).cloned())
    }

    /// All values as strings, `stringData` taking precedence as the API server does.
    ///
    /// Fails with `Malformed` when a `data` value is not UTF-8, like `lookup`.
    pub fn property_map(&self) -> Result<PropertyMap> {
        let mut map = PropertyMap::new();
        for key in self.data.keys() {
            if let Some(value) = self.lookup(key)? {
                map.insert(key.clone(), value);
            }
        }
        map.extend(self.string_data.clone());
        Ok(map)
    }

    /// Overlay type, labels, annotations and data from `source`
    pub fn overlay_from(&mut self, source: &SecretObject) {
        if let Some(t) = source.secret_type.as_ref().filter(|t| !t.is_empty()) {
            self.secret_type = Some(t.clone());
        }
        self.metadata.labels.extend(source.metadata.labels.clone());
        self.metadata
            .annotations
            .extend(source.metadata.annotations.clone());
        self.data.extend(source.data.clone());
    }
}

impl std::fmt::Debug for SecretObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretObject")
            .field("metadata", &self.metadata)
            .field("type", &self.secret_type)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("string_data", &self.string_data.keys().collect::<Vec<_>>())
            .finish()
    }
}
