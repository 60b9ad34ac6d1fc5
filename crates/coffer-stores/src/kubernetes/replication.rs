//! Copying a written Secret into other namespaces
//!
//! A Secret whose write carries the replicate-to annotation is copied, after
//! the write succeeds, into every namespace the annotation lists. Targets are
//! processed one at a time; the first failure stops replication and earlier
//! copies are left in place.

use super::object::SecretObject;
use super::SecretObjectApi;
use coffer_core::{BackendKind, Result, SecretContext};
use tracing::{debug, info};

/// Namespaces listed in a replicate-to annotation value.
///
/// Entries are trimmed; empty entries and the source namespace are skipped.
pub fn replication_targets(annotation: Option<&str>, source_namespace: &str) -> Vec<String> {
    let Some(value) = annotation else {
        return Vec::new();
    };
    let mut targets: Vec<String> = Vec::new();
    for ns in value.split(',').map(str::trim) {
        if ns.is_empty() || ns == source_namespace || targets.iter().any(|t| t == ns) {
            continue;
        }
        targets.push(ns.to_string());
    }
    targets
}

/// Copy `source` into each target namespace in order
pub async fn replicate<A: SecretObjectApi + ?Sized>(
    api: &A,
    source: &SecretObject,
    targets: &[String],
) -> Result<()> {
    for namespace in targets {
        copy_to_namespace(api, namespace, source)
            .await
            .secret_context(BackendKind::Kubernetes, "replicate", namespace, source.name())?;
        info!("Replicated Secret {} to namespace {}", source.name(), namespace);
    }
    Ok(())
}

/// Get-or-create the same-named Secret in `namespace` and overlay `source` onto it
async fn copy_to_namespace<A: SecretObjectApi + ?Sized>(
    api: &A,
    namespace: &str,
    source: &SecretObject,
) -> Result<SecretObject> {
    match api.get(namespace, source.name()).await {
        Ok(mut target) => {
            debug!("Updating replica {}/{}", namespace, source.name());
            target.overlay_from(source);
            api.update(namespace, &target).await
        }
        Err(e) if e.is_not_found() => {
            debug!("Creating replica {}/{}", namespace, source.name());
            let mut target = SecretObject::new(namespace, source.name());
            target.overlay_from(source);
            api.create(namespace, &target).await
        }
        Err(e) => Err(e),
    }
}
