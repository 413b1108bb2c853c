pub mod errors;
pub mod operation;
pub mod service_manager;
pub mod tunnel;

// Re-export the modules here for easy import elsewhere.
pub use errors::ServiceError;
pub use operation::{Enablement, Operation, ProxyOutcome};
pub use service_manager::{is_gitlab_host, ServiceManager, HTTPS_PROXY, HTTP_PROXY};
