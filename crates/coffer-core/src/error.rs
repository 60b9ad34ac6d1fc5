//! Error types for coffer-core

use crate::backend::BackendKind;
use thiserror::Error;

/// Result type alias using coffer-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Backend-agnostic classification of a failure.
///
/// Adapters branch on these tags only; they never inspect SDK-specific
/// error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AccessDenied,
    Malformed,
    UnsupportedBackend,
    Transport,
    Config,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::Malformed => "malformed",
            ErrorKind::UnsupportedBackend => "unsupported backend",
            ErrorKind::Transport => "transport",
            ErrorKind::Config => "configuration",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Core error types for Coffer
#[derive(Error, Debug)]
pub enum Error {
    /// The secret (or the requested key of a key/value secret) does not exist
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// The secret container already exists
    #[error("Secret already exists: {0}")]
    AlreadyExists(String),

    /// The backend rejected the credentials or the caller lacks permission
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Payload is not decodable as a property map
    #[error("Malformed secret payload: {0}")]
    Malformed(String),

    /// Unknown backend tag
    #[error("Unsupported backend: {tag}. Valid backends: asm, ssm, gcp, azure, kubernetes, vault")]
    UnsupportedBackend { tag: String },

    /// Network or backend failure that has no more specific kind
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure annotated with the backend, location and secret it concerns
    #[error("{backend}: failed to {operation} secret '{name}' at '{location}': {cause}")]
    Secret {
        backend: BackendKind,
        operation: &'static str,
        location: String,
        name: String,
        cause: Box<Error>,
    },
}

impl Error {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an already exists error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists(message.into())
    }

    /// Create an access denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// Create a malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an unsupported backend error
    pub fn unsupported_backend(tag: impl Into<String>) -> Self {
        Self::UnsupportedBackend { tag: tag.into() }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// The normalized kind of this error, looking through secret context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::AccessDenied(_) => ErrorKind::AccessDenied,
            Error::Malformed(_) | Error::Json(_) => ErrorKind::Malformed,
            Error::UnsupportedBackend { .. } => ErrorKind::UnsupportedBackend,
            Error::Transport(_) => ErrorKind::Transport,
            Error::ConfigNotFound { .. } | Error::InvalidConfig { .. } | Error::YamlParse(_) => {
                ErrorKind::Config
            }
            Error::Io(_) => ErrorKind::Io,
            Error::Secret { cause, .. } => cause.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }
}

/// Attaches backend, location and secret name to a failed result
pub trait SecretContext<T> {
    fn secret_context(
        self,
        backend: BackendKind,
        operation: &'static str,
        location: &str,
        name: &str,
    ) -> Result<T>;
}

impl<T> SecretContext<T> for Result<T> {
    fn secret_context(
        self,
        backend: BackendKind,
        operation: &'static str,
        location: &str,
        name: &str,
    ) -> Result<T> {
        self.map_err(|cause| Error::Secret {
            backend,
            operation,
            location: location.to_string(),
            name: name.to_string(),
            cause: Box::new(cause),
        })
    }
}
