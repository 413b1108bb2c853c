pub mod config;
pub mod store;

pub use config::{HostFields, SshConfig};
pub use store::{HostId, SshConfigStore};
