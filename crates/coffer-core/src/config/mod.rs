//! Configuration loading and management

mod loader;
mod settings;

pub use loader::CofferConfig;
pub use settings::{
    AwsSettings, AzureSettings, CofferConfigFile, GcpSettings, KubernetesSettings, VaultSettings,
};
