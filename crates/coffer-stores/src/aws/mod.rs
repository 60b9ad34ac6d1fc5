//! AWS Secrets Manager and Systems Manager Parameter Store
//!
//! Both services address secrets by region: the location of a secret is the
//! region name, and an empty location means the region of the shared
//! `SdkConfig`. Clients are built lazily, one per region, and reused.

mod parameter_store;
mod secrets_manager;

pub use parameter_store::ParameterStore;
pub use secrets_manager::SecretsManagerStore;

use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata};
use coffer_core::Error;

/// Normalize an AWS SDK error by its service error code
pub(crate) fn classify<E>(err: &E, what: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error,
{
    from_code(err.code(), format!("{}: {}", what, DisplayErrorContext(err)))
}

fn from_code(code: Option<&str>, message: String) -> Error {
    match code {
        Some("ResourceExistsException") | Some("ParameterAlreadyExists") => {
            Error::already_exists(message)
        }
        Some("ResourceNotFoundException") | Some("ParameterNotFound") => {
            Error::not_found(message)
        }
        Some("AccessDeniedException")
        | Some("UnrecognizedClientException")
        | Some("ExpiredTokenException") => Error::access_denied(message),
        _ => Error::transport(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::ErrorKind;

    #[test]
    fn test_error_codes() {
        let cases = [
            (Some("ResourceExistsException"), ErrorKind::AlreadyExists),
            (Some("ParameterAlreadyExists"), ErrorKind::AlreadyExists),
            (Some("ResourceNotFoundException"), ErrorKind::NotFound),
            (Some("ParameterNotFound"), ErrorKind::NotFound),
            (Some("AccessDeniedException"), ErrorKind::AccessDenied),
            (Some("ExpiredTokenException"), ErrorKind::AccessDenied),
            (Some("ThrottlingException"), ErrorKind::Transport),
            (None, ErrorKind::Transport),
        ];
        for (code, kind) in cases {
            assert_eq!(from_code(code, "op".into()).kind(), kind, "{:?}", code);
        }
    }
}
