pub mod environment;
pub mod errors;
pub mod keyed_store;
pub mod ssh;
pub mod system;

// Re-export the modules here for easy import elsewhere.
pub use environment::EnvironmentStore;
pub use errors::StoreError;
pub use keyed_store::{Access, KeyedStore, Scoped};
pub use ssh::{HostFields, HostId, SshConfigStore};
pub use system::{FileProxyStore, PlatformProxyStore, SettingValue};
