use std::io;

use log::{debug, info};
use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_SET_VALUE};
use winreg::RegKey;

use super::{ProxyKey, ProxyWrite, SettingValue, ENABLED, SERVER};
use crate::stores::errors::StoreError;
use crate::stores::keyed_store::{Access, KeyedStore};

const STORE: &str = "system proxy (registry)";

const INTERNET_SETTINGS: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";
const PROXY_ENABLE: &str = "ProxyEnable";
const PROXY_SERVER: &str = "ProxyServer";

/// The per-user WinINet proxy settings under `HKEY_CURRENT_USER`.
///
/// Writes go straight to the registry; there is no buffering.
#[derive(Debug, Default)]
pub struct RegistryProxyStore {
    key: Option<RegKey>,
    access: Option<Access>,
}

impl RegistryProxyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&self, operation: &str) -> Result<&RegKey, StoreError> {
        self.key
            .as_ref()
            .ok_or_else(|| StoreError::unsupported(STORE, format!("{operation} before open")))
    }

    fn writable_key(&self, operation: &str) -> Result<&RegKey, StoreError> {
        let key = self.key(operation)?;
        if self.access.is_some_and(Access::can_write) {
            Ok(key)
        } else {
            Err(StoreError::unsupported(
                STORE,
                format!("{operation} through a read-only handle"),
            ))
        }
    }

    fn enabled(key: &RegKey) -> Result<bool, StoreError> {
        match key.get_value::<u32, _>(PROXY_ENABLE) {
            Ok(value) => Ok(value != 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(STORE, e).with_key(ENABLED)),
        }
    }

    fn server(key: &RegKey) -> Result<Option<String>, StoreError> {
        match key.get_value::<String, _>(PROXY_SERVER) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(STORE, e).with_key(SERVER)),
        }
    }
}

impl KeyedStore for RegistryProxyStore {
    type Key = str;
    type Value = SettingValue;

    fn name(&self) -> &'static str {
        STORE
    }

    fn open(&mut self, access: Access) -> Result<(), StoreError> {
        let flags = match access {
            Access::ReadOnly => KEY_READ,
            Access::ReadWrite => KEY_READ | KEY_SET_VALUE,
        };
        let key = RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey_with_flags(INTERNET_SETTINGS, flags)
            .map_err(|e| StoreError::io(STORE, e))?;
        debug!("Opened HKCU\\{INTERNET_SETTINGS} ({access:?})");
        self.key = Some(key);
        self.access = Some(access);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // Dropping the RegKey closes the handle.
        self.key = None;
        self.access = None;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<SettingValue>, StoreError> {
        let reg = self.key("get")?;
        Ok(match ProxyKey::parse(STORE, key, "get")? {
            ProxyKey::Enabled => Some(SettingValue::Flag(Self::enabled(reg)?)),
            ProxyKey::Server => Self::server(reg)?.map(SettingValue::Text),
        })
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<(), StoreError> {
        let reg = self.writable_key("set")?;
        let written = match ProxyWrite::check(STORE, key, value)? {
            ProxyWrite::Enabled(flag) => {
                info!("Registry: {PROXY_ENABLE} = {}", u32::from(flag));
                reg.set_value(PROXY_ENABLE, &u32::from(flag))
            }
            ProxyWrite::Server(server) => {
                info!("Registry: {PROXY_SERVER} = {server}");
                reg.set_value(PROXY_SERVER, &server)
            }
        };
        written.map_err(|e| StoreError::io(STORE, e).with_key(key))
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let reg = self.writable_key("delete")?;
        match ProxyKey::parse(STORE, key, "delete")? {
            ProxyKey::Enabled => Err(StoreError::unsupported(
                STORE,
                "delete of the enable flag (it is toggled, never removed)",
            )),
            ProxyKey::Server => match reg.delete_value(PROXY_SERVER) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::io(STORE, e).with_key(key)),
            },
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let reg = self.key("keys")?;
        let mut keys = vec![ENABLED.to_string()];
        if Self::server(reg)?.is_some() {
            keys.push(SERVER.to_string());
        }
        Ok(keys)
    }
}
