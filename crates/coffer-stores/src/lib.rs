//! Backend adapters for Coffer
//!
//! This crate implements the `SecretManager` contract for each supported
//! secret store:
//!
//! - AWS Secrets Manager and Parameter Store (opaque blobs, per region)
//! - Google Cloud Secret Manager (opaque blobs, per project)
//! - Azure Key Vault (opaque blobs, per vault)
//! - Kubernetes Secrets (native maps, per namespace, with replication)
//! - HashiCorp Vault KV v2 (native maps, per address)
//!
//! Opaque-blob stores share one get-merge-set implementation in
//! [`protocol`]; key/value stores overlay properties natively.

pub mod aws;
pub mod azure;
pub mod credentials;
pub mod factory;
pub mod gcp;
mod http;
pub mod kubernetes;
pub mod memory;
pub mod protocol;
pub mod vault;

pub use credentials::connect;
pub use factory::{create_secret_manager, lookup, BackendClient, BackendDescriptor, BACKENDS};
pub use protocol::{BlobSecretManager, BlobStore, StoredBlob};
