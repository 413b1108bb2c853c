use std::fmt::{self, Display};

use super::operation::Operation;
use crate::stores::StoreError;
use crate::uri::UriError;

/// Errors surfaced by the service manager.
#[derive(Debug)]
pub enum ServiceError {
    /// `update` / `enable` were asked for without a proxy URI.
    MissingUri(Operation),
    Uri(UriError),
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

impl From<UriError> for ServiceError {
    fn from(err: UriError) -> Self {
        ServiceError::Uri(err)
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::MissingUri(op) => write!(f, "'{op}' needs a proxy URI"),
            ServiceError::Uri(e) => write!(f, "{e}"),
            ServiceError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::MissingUri(_) => None,
            ServiceError::Uri(e) => Some(e),
            ServiceError::Store(e) => Some(e),
        }
    }
}
