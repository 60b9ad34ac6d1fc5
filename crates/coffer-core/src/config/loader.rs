//! Configuration file loading and parsing

use super::settings::CofferConfigFile;
use crate::backend::BackendKind;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["coffer.yaml", "coffer.yml"];

/// Loaded Coffer configuration
#[derive(Debug, Clone, Default)]
pub struct CofferConfig {
    /// The parsed configuration
    pub config: CofferConfigFile,

    /// Path to the configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,
}

impl CofferConfig {
    /// Load configuration from an explicit path
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        Self::from_yaml(&content, Some(path.to_owned()))
    }

    /// Load the given file, or search for one, falling back to defaults.
    ///
    /// Environment overrides are applied in every case.
    pub fn discover(path: Option<&Utf8Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => {
                let cwd = std::env::current_dir().map_err(Error::Io)?;
                let cwd = Utf8PathBuf::try_from(cwd).map_err(|_| {
                    Error::invalid_config("Current directory path is not valid UTF-8")
                })?;
                match Self::find_config(&cwd) {
                    Some(found) => Self::load(&found)?,
                    None => {
                        debug!("No coffer.yaml found, using defaults");
                        Self::default()
                    }
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str, config_path: Option<Utf8PathBuf>) -> Result<Self> {
        let config: CofferConfigFile = if content.trim().is_empty() {
            CofferConfigFile::default()
        } else {
            serde_yaml_ng::from_str(content)?
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Find a configuration file in `start` or its parent directories
    pub fn find_config(start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = start;

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    debug!("Using configuration file {}", path);
                    return Some(path);
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Fill unset connection settings from the conventional environment variables
    pub fn apply_env(&mut self) {
        let vault = &mut self.config.vault;
        if vault.address.is_none() {
            vault.address = non_empty_env("VAULT_ADDR");
        }
        if vault.namespace.is_none() {
            vault.namespace = non_empty_env("VAULT_NAMESPACE");
        }
        if vault.ca_cert.is_none() {
            vault.ca_cert = non_empty_env("VAULT_CACERT").map(Utf8PathBuf::from);
        }
        if let Some(skip) = non_empty_env("VAULT_SKIP_VERIFY") {
            vault.skip_verify = skip == "true" || skip == "1";
        }

        let kube = &mut self.config.kubernetes;
        if kube.kubeconfig.is_none() {
            // Only the first entry of a KUBECONFIG path list is honoured
            kube.kubeconfig = non_empty_env("KUBECONFIG")
                .and_then(|v| v.split(':').next().map(Utf8PathBuf::from));
        }
    }

    /// Default backend, if configured
    pub fn backend(&self) -> Option<BackendKind> {
        self.config.backend
    }

    /// Default location, if configured
    pub fn location(&self) -> Option<&str> {
        self.config.location.as_deref()
    }

    /// Get the inner configuration file
    pub fn inner(&self) -> &CofferConfigFile {
        &self.config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
