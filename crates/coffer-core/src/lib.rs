//! # coffer-core
//!
//! Core library for Coffer providing:
//! - The secret value model and its merge-on-write semantics
//! - The `SecretManager` contract every backend adapter implements
//! - Normalized error kinds shared by all backends
//! - Configuration file parsing (coffer.yaml)

pub mod backend;
pub mod config;
pub mod contract;
pub mod error;
pub mod security;
pub mod types;
pub mod value;

pub use backend::BackendKind;
pub use config::CofferConfig;
pub use contract::SecretManager;
pub use error::{Error, ErrorKind, Result, SecretContext};
pub use security::{AuditLog, SecureString};
pub use types::{PropertyMap, SecretLocation, REPLICATE_TO_ANNOTATION, SECRET_TYPE_OPAQUE};
pub use value::SecretValue;
