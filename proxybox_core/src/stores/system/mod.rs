//! The machine-wide proxy setting: an enable flag plus a `host:port` server.
//!
//! Two logical keys are exposed no matter which platform backs them:
//! [`ENABLED`] (a [`SettingValue::Flag`]) and [`SERVER`] (a
//! [`SettingValue::Text`], present only while enabled).

pub mod file;
#[cfg(windows)]
pub mod registry;

pub use file::FileProxyStore;
#[cfg(windows)]
pub use registry::RegistryProxyStore;

use super::errors::StoreError;

pub const ENABLED: &str = "enabled";
pub const SERVER: &str = "server";

/// The store used for the current platform.
#[cfg(windows)]
pub type PlatformProxyStore = RegistryProxyStore;
#[cfg(not(windows))]
pub type PlatformProxyStore = FileProxyStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Flag(bool),
    Text(String),
}

impl SettingValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(flag) => Some(*flag),
            SettingValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(text) => Some(text),
            SettingValue::Flag(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProxyKey {
    Enabled,
    Server,
}

impl ProxyKey {
    pub(crate) fn parse(store: &'static str, key: &str, operation: &str) -> Result<Self, StoreError> {
        match key {
            ENABLED => Ok(ProxyKey::Enabled),
            SERVER => Ok(ProxyKey::Server),
            other => Err(StoreError::unsupported(
                store,
                format!("{operation} on unknown key '{other}'"),
            )),
        }
    }
}

/// A type-checked write to one of the two keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProxyWrite {
    Enabled(bool),
    Server(String),
}

impl ProxyWrite {
    pub(crate) fn check(store: &'static str, key: &str, value: SettingValue) -> Result<Self, StoreError> {
        match (ProxyKey::parse(store, key, "set")?, value) {
            (ProxyKey::Enabled, SettingValue::Flag(flag)) => Ok(ProxyWrite::Enabled(flag)),
            (ProxyKey::Enabled, SettingValue::Text(_)) => {
                Err(StoreError::type_kind(store, key, "a boolean"))
            }
            (ProxyKey::Server, SettingValue::Text(server)) => Ok(ProxyWrite::Server(server)),
            (ProxyKey::Server, SettingValue::Flag(_)) => {
                Err(StoreError::type_kind(store, key, "a host:port string"))
            }
        }
    }
}
