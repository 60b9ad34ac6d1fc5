//! CLI command implementations

pub mod backends;
pub mod get;
pub mod set;

use crate::cli::TargetArgs;
use anyhow::{bail, Context, Result};
use camino::Utf8Path;
use coffer_core::{BackendKind, CofferConfig, SecretLocation, SecretManager};
use coffer_stores::{connect, create_secret_manager, lookup};
use tracing::debug;

/// Backend and location for a command, after falling back to the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub backend: BackendKind,
    pub at: SecretLocation,
}

pub fn resolve(target: &TargetArgs, config: &CofferConfig) -> Result<Resolved> {
    let backend = match target.backend.as_deref() {
        Some(tag) => lookup(tag)?,
        None => config
            .backend()
            .context("No backend given; pass --backend or set `backend` in coffer.yaml")?,
    };

    let location = target
        .location
        .as_deref()
        .or_else(|| config.location())
        .unwrap_or_default()
        .trim()
        .to_string();
    // Vault falls back to its configured address
    if location.is_empty() && backend != BackendKind::Vault {
        bail!(
            "No location given for {}; pass --location <{}>",
            backend,
            backend.location_hint()
        );
    }

    Ok(Resolved {
        backend,
        at: SecretLocation::new(location, target.name.clone()),
    })
}

/// Load configuration, resolve the target and connect to its backend
pub async fn open(
    target: &TargetArgs,
    config_path: Option<&Utf8Path>,
) -> Result<(Resolved, Box<dyn SecretManager>)> {
    let config = CofferConfig::discover(config_path)?;
    let resolved = resolve(target, &config)?;
    debug!(
        "Using {} at '{}' (config: {:?})",
        resolved.backend, resolved.at.location, config.config_path
    );
    let client = connect(resolved.backend, &config)
        .await
        .with_context(|| format!("Failed to connect to {}", resolved.backend))?;
    let manager = create_secret_manager(resolved.backend, client)?;
    Ok((resolved, manager))
}
