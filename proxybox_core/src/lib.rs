pub mod config;
pub mod core;
pub mod storage;
pub mod stores;
pub mod uri;
pub mod utils;

// re‑export ergonomic entry points
pub use crate::config::ServiceConfig;
pub use crate::core::{Enablement, Operation, ProxyOutcome, ServiceError, ServiceManager};
pub use crate::storage::ProfileStore;
pub use crate::stores::{KeyedStore, StoreError};
pub use crate::uri::{ProxyUri, UriError};
