//! Credential handling and audit logging
//!
//! Provides:
//! - SecureString for tokens, zeroized on drop
//! - Audit entries for secret reads and writes (never logs secret values)
//! - Error sanitization

use crate::backend::BackendKind;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that is automatically zeroed on drop
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Get the string value (use with caution)
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString([REDACTED {} bytes])", self.len())
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Audit entry for a secret operation
#[derive(Debug, Clone)]
pub struct AuditLog {
    pub operation: String,
    pub backend: BackendKind,
    pub location: String,
    pub secret_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: std::time::SystemTime,
}

impl AuditLog {
    pub fn new(
        operation: impl Into<String>,
        backend: BackendKind,
        location: impl Into<String>,
        secret_name: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            backend,
            location: location.into(),
            secret_name: secret_name.into(),
            success: true,
            error: None,
            timestamp: std::time::SystemTime::now(),
        }
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.success = false;
        self.error = Some(sanitize_error(error));
        self
    }

    /// Record the outcome of `result` and log it
    pub fn record<T, E: fmt::Display>(self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.log(),
            Err(e) => self.with_error(&e.to_string()).log(),
        }
    }

    /// Log the audit entry (never logs secret values)
    pub fn log(&self) {
        if self.success {
            tracing::info!(
                operation = %self.operation,
                backend = %self.backend,
                location = %self.location,
                secret_name = %self.secret_name,
                timestamp = ?self.timestamp,
                "Secret operation successful"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                backend = %self.backend,
                location = %self.location,
                secret_name = %self.secret_name,
                error = ?self.error,
                timestamp = ?self.timestamp,
                "Secret operation failed"
            );
        }
    }
}

/// Sanitize error messages to remove potential secret values
pub fn sanitize_error(error: &str) -> String {
    let patterns_to_redact = [
        (r"(?i)token[=:]\s*([^\s]+)", "token=[REDACTED]"),
        (r"(?i)password[=:]\s*([^\s]+)", "password=[REDACTED]"),
        (r"(?i)secret[=:]\s*([^\s]+)", "secret=[REDACTED]"),
        (r"(?i)bearer\s+[^\s]+", "Bearer [REDACTED]"),
        // Base64-looking strings (48+ chars of base64 characters)
        (r"[A-Za-z0-9+/]{48,}={0,2}", "[REDACTED_BASE64]"),
    ];

    let mut sanitized = error.to_string();

    for (pattern, replacement) in patterns_to_redact {
        if let Ok(re) = regex::Regex::new(pattern) {
            sanitized = re.replace_all(&sanitized, replacement).to_string();
        }
    }

    sanitized
}
