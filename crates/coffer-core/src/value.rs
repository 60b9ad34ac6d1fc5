//! Desired secret content and its merge-on-write semantics
//!
//! Opaque-blob backends store a structured secret as the JSON encoding of a
//! flat string map. A write that carries property values is merged into
//! whatever the backend already holds, so setting one property leaves the
//! others untouched. A flat write always replaces the whole secret.
//!
//! When a value carries both a flat string and property values, the property
//! values win everywhere.

use crate::error::{Error, Result};
use crate::types::PropertyMap;
use std::collections::BTreeMap;
use tracing::warn;
use zeroize::Zeroize;

/// Caller-supplied content for a secret write
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    /// Unstructured content
    pub value: Option<String>,
    /// Structured content; authoritative whenever non-empty
    pub property_values: PropertyMap,
    /// Backend-specific classification (e.g. `kubernetes.io/basic-auth`)
    pub secret_type: Option<String>,
    /// Backend metadata, overlaid onto existing labels
    pub labels: BTreeMap<String, String>,
    /// Backend metadata, overlaid onto existing annotations
    pub annotations: BTreeMap<String, String>,
    /// Discard pre-existing content instead of merging
    pub overwrite: bool,
}

impl SecretValue {
    /// An unstructured secret
    pub fn flat(value: impl Into<String>) -> Self {
        let mut secret = Self::default();
        secret.value = Some(value.into());
        secret
    }

    /// A structured secret from name/value pairs
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut secret = Self::default();
        secret.property_values = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        secret
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.property_values.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_type(mut self, secret_type: impl Into<String>) -> Self {
        self.secret_type = Some(secret_type.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Whether the property values are the authoritative content
    pub fn is_structured(&self) -> bool {
        !self.property_values.is_empty()
    }

    /// The flat value, or an empty string when none was given
    pub fn flat_value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    /// The serialized form: JSON of the properties when present, otherwise
    /// the flat value verbatim.
    pub fn to_payload(&self) -> Result<String> {
        if self.is_structured() {
            encode_property_map(&self.property_values)
        } else {
            Ok(self.flat_value().to_string())
        }
    }

    /// Merge this value into the content already stored by the backend.
    ///
    /// Keys present only in `existing` survive a structured write. Overwrite
    /// and flat writes ignore `existing` entirely.
    pub fn merge_with(&self, existing: &PropertyMap) -> Result<String> {
        if self.overwrite || !self.is_structured() {
            return self.to_payload();
        }

        let mut merged = existing.clone();
        for (key, value) in &self.property_values {
            merged.insert(key.clone(), value.clone());
        }
        let payload = encode_property_map(&merged);
        merged.values_mut().for_each(Zeroize::zeroize);
        payload
    }

    /// The properties a key/value backend should overlay for this value.
    ///
    /// A flat value must itself be a JSON property map, since key/value
    /// backends have nowhere to put an unstructured string. A value with
    /// neither properties nor a flat value carries no content, and the write
    /// only touches metadata.
    pub fn key_value_content(&self) -> Result<PropertyMap> {
        if self.is_structured() {
            Ok(self.property_values.clone())
        } else if self.flat_value().is_empty() {
            Ok(PropertyMap::new())
        } else {
            decode_property_map(self.flat_value())
        }
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field(
                "value",
                &self
                    .value
                    .as_ref()
                    .map(|v| format!("[REDACTED {} bytes]", v.len())),
            )
            .field(
                "property_values",
                &self.property_values.keys().collect::<Vec<_>>(),
            )
            .field("secret_type", &self.secret_type)
            .field("labels", &self.labels)
            .field("annotations", &self.annotations)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

impl Drop for SecretValue {
    fn drop(&mut self) {
        if let Some(value) = self.value.as_mut() {
            value.zeroize();
        }
        self.property_values.values_mut().for_each(Zeroize::zeroize);
    }
}

/// Encode a property map as a flat JSON object
pub fn encode_property_map(map: &PropertyMap) -> Result<String> {
    Ok(serde_json::to_string(map)?)
}

/// Decode a payload that must be a flat JSON object of string values
pub fn decode_property_map(payload: &str) -> Result<PropertyMap> {
    serde_json::from_str(payload).map_err(|e| {
        Error::malformed(format!(
            "expected a JSON object of string values: {}",
            e
        ))
    })
}

/// Decode stored content for merging, treating anything undecodable as empty.
///
/// A secret that was previously flat (or is corrupt) must never block a
/// structured write.
pub fn existing_property_map(payload: Option<&str>) -> PropertyMap {
    let Some(payload) = payload.filter(|p| !p.trim().is_empty()) else {
        return PropertyMap::new();
    };
    match decode_property_map(payload) {
        Ok(map) => map,
        Err(e) => {
            warn!("Existing secret content is not a property map, merging onto empty: {}", e);
            PropertyMap::new()
        }
    }
}

/// Read one property out of a structured payload.
///
/// A missing key yields an empty string; only an undecodable payload fails.
pub fn extract_property(payload: &str, key: &str) -> Result<String> {
    let map = decode_property_map(payload)
        .map_err(|e| Error::malformed(format!("cannot read property '{}': {}", key, e)))?;
    Ok(map.get(key).cloned().unwrap_or_default())
}
