//! Shared types for addressing secrets

use std::collections::BTreeMap;

/// Named fields of a structured secret.
///
/// Sorted so the JSON encoding of a structured secret is deterministic.
pub type PropertyMap = BTreeMap<String, String>;

/// Default Kubernetes secret type
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

/// Annotation listing the namespaces a Kubernetes secret is replicated to
pub const REPLICATE_TO_ANNOTATION: &str = "secret.coffer.dev/replicate-to";

/// Identifies one secret, or one property of it, within a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocation {
    /// Backend scope: region, vault name, project id, namespace or vault address
    pub location: String,
    /// Secret name
    pub name: String,
    /// Property key inside a structured secret
    pub property: Option<String>,
}

impl SecretLocation {
    pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            property: None,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// The property key, treating an empty key as "whole secret"
    pub fn property_key(&self) -> Option<&str> {
        self.property.as_deref().filter(|p| !p.is_empty())
    }
}

impl std::fmt::Display for SecretLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.location, self.name)?;
        if let Some(property) = self.property_key() {
            write!(f, "#{}", property)?;
        }
        Ok(())
    }
}
