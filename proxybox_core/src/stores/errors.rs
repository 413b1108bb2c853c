use std::fmt::{self, Display};
use std::io;

/// A central error enum for store-related errors.
///
/// Every variant carries the name of the backend that failed so a user can
/// tell *which* of the stores refused the change.
#[derive(Debug)]
pub enum StoreError {
    /// The backend does not offer this operation (or not on this handle).
    Unsupported {
        store: &'static str,
        operation: String,
    },
    /// The value handed to `set` has the wrong type for that key.
    TypeKind {
        store: &'static str,
        key: String,
        expected: &'static str,
    },
    /// A lookup missed. Callers usually treat this as "absent".
    NotFound { store: &'static str, key: String },
    /// The underlying file / registry / environment could not be accessed.
    Io {
        store: &'static str,
        key: Option<String>,
        source: io::Error,
    },
}

impl StoreError {
    pub fn unsupported(store: &'static str, operation: impl Into<String>) -> Self {
        StoreError::Unsupported {
            store,
            operation: operation.into(),
        }
    }

    pub fn type_kind(store: &'static str, key: impl Into<String>, expected: &'static str) -> Self {
        StoreError::TypeKind {
            store,
            key: key.into(),
            expected,
        }
    }

    pub fn not_found(store: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            store,
            key: key.into(),
        }
    }

    pub fn io(store: &'static str, source: io::Error) -> Self {
        StoreError::Io {
            store,
            key: None,
            source,
        }
    }

    /// Attach the key that was being read or written when the I/O failed.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        match self {
            StoreError::Io { store, source, .. } => StoreError::Io {
                store,
                key: Some(key.into()),
                source,
            },
            other => other,
        }
    }

    /// Name of the backend that produced the error.
    pub fn store(&self) -> &'static str {
        match self {
            StoreError::Unsupported { store, .. }
            | StoreError::TypeKind { store, .. }
            | StoreError::NotFound { store, .. }
            | StoreError::Io { store, .. } => store,
        }
    }
}

/// Convert from std::io::Error when the backend is not known yet.
impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> StoreError {
        StoreError::io("unknown", err)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unsupported { store, operation } => {
                write!(f, "{store}: unsupported operation: {operation}")
            }
            StoreError::TypeKind {
                store,
                key,
                expected,
            } => write!(f, "{store}: value for '{key}' must be {expected}"),
            StoreError::NotFound { store, key } => write!(f, "{store}: '{key}' not found"),
            StoreError::Io {
                store,
                key: Some(key),
                source,
            } => write!(f, "{store}: IO error on '{key}': {source}"),
            StoreError::Io {
                store,
                key: None,
                source,
            } => write!(f, "{store}: IO error: {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
