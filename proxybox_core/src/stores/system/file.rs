use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{ProxyKey, ProxyWrite, SettingValue, ENABLED, SERVER};
use crate::stores::errors::StoreError;
use crate::stores::keyed_store::{Access, KeyedStore};
use crate::utils::fs::{read_optional, write_atomic};

const STORE: &str = "system proxy";

/// On-disk form of the system proxy setting.
///
/// JSON looks like `{ "enabled": true, "server": "10.0.0.1:3128" }`; the
/// `server` field is left out entirely while disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ProxySettings {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server: Option<String>,
}

/// System proxy setting kept in a JSON file, used where there is no
/// registry to write to.
///
/// Every `set` or `delete` that changes the setting is written to disk before
/// it returns. Writes that change nothing leave the file alone.
#[derive(Debug)]
pub struct FileProxyStore {
    path: PathBuf,
    access: Option<Access>,
    settings: ProxySettings,
}

impl FileProxyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            access: None,
            settings: ProxySettings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn access(&self, operation: &str) -> Result<Access, StoreError> {
        self.access
            .ok_or_else(|| StoreError::unsupported(STORE, format!("{operation} before open")))
    }

    fn writable(&self, operation: &str) -> Result<(), StoreError> {
        if self.access(operation)?.can_write() {
            Ok(())
        } else {
            Err(StoreError::unsupported(
                STORE,
                format!("{operation} through a read-only handle"),
            ))
        }
    }

    fn load(&self) -> Result<ProxySettings, StoreError> {
        let text = read_optional(&self.path).map_err(|e| StoreError::io(STORE, e))?;
        match text {
            None => Ok(ProxySettings::default()),
            Some(text) if text.trim().is_empty() => Ok(ProxySettings::default()),
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::io(STORE, io::Error::from(e))),
        }
    }

    /// Persist `settings` and adopt them, or keep the old ones if the write
    /// fails.
    fn save(&mut self, key: &str, settings: ProxySettings) -> Result<(), StoreError> {
        if settings == self.settings {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| StoreError::io(STORE, io::Error::from(e)).with_key(key))?;
        info!("Writing system proxy {key} to {:?}", self.path);
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| StoreError::io(STORE, e).with_key(key))?;
        self.settings = settings;
        Ok(())
    }
}

impl KeyedStore for FileProxyStore {
    type Key = str;
    type Value = SettingValue;

    fn name(&self) -> &'static str {
        STORE
    }

    fn open(&mut self, access: Access) -> Result<(), StoreError> {
        self.settings = self.load()?;
        self.access = Some(access);
        debug!("Loaded system proxy settings from {:?}", self.path);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.access = None;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<SettingValue>, StoreError> {
        self.access("get")?;
        Ok(match ProxyKey::parse(STORE, key, "get")? {
            ProxyKey::Enabled => Some(SettingValue::Flag(self.settings.enabled)),
            ProxyKey::Server => self.settings.server.clone().map(SettingValue::Text),
        })
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<(), StoreError> {
        self.writable("set")?;
        let mut settings = self.settings.clone();
        match ProxyWrite::check(STORE, key, value)? {
            ProxyWrite::Enabled(flag) => settings.enabled = flag,
            ProxyWrite::Server(server) => settings.server = Some(server),
        }
        self.save(key, settings)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.writable("delete")?;
        match ProxyKey::parse(STORE, key, "delete")? {
            ProxyKey::Enabled => Err(StoreError::unsupported(
                STORE,
                "delete of the enable flag (it is toggled, never removed)",
            )),
            ProxyKey::Server => {
                let settings = ProxySettings {
                    server: None,
                    ..self.settings.clone()
                };
                self.save(key, settings)
            }
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.access("keys")?;
        let mut keys = vec![ENABLED.to_string()];
        if self.settings.server.is_some() {
            keys.push(SERVER.to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_in(dir: &tempfile::TempDir) -> FileProxyStore {
        FileProxyStore::new(dir.path().join("system_proxy.json"))
    }

    #[test]
    fn missing_file_reads_as_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.open(Access::ReadOnly).unwrap();

        assert_eq!(store.get(ENABLED).unwrap(), Some(SettingValue::Flag(false)));
        assert_eq!(store.get(SERVER).unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec![ENABLED.to_string()]);
        store.close().unwrap();
        assert!(!store.path().exists(), "read-only use must not create the file");
    }

    #[test]
    fn rejects_wrong_value_types() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.open(Access::ReadWrite).unwrap();

        let err = store.set(SERVER, SettingValue::Flag(true)).unwrap_err();
        assert!(matches!(err, StoreError::TypeKind { .. }), "got {err:?}");

        let err = store
            .set(ENABLED, SettingValue::Text("yes".into()))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeKind { .. }), "got {err:?}");

        let err = store.set("bypass", SettingValue::Flag(true)).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }), "got {err:?}");
    }

    #[test]
    fn read_only_handle_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.open(Access::ReadOnly).unwrap();

        let err = store.set(ENABLED, SettingValue::Flag(true)).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
    }

    #[test]
    fn writes_are_persisted_immediately_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        store.open(Access::ReadWrite).unwrap();
        store.set(ENABLED, SettingValue::Flag(true)).unwrap();
        store
            .set(SERVER, SettingValue::Text("1.2.3.4:5555".into()))
            .unwrap();
        // On disk before the handle is closed.
        let first = fs::read(store.path()).unwrap();
        store.close().unwrap();

        store.open(Access::ReadWrite).unwrap();
        let mtime = fs::metadata(store.path()).unwrap().modified().unwrap();
        store.set(ENABLED, SettingValue::Flag(true)).unwrap();
        store
            .set(SERVER, SettingValue::Text("1.2.3.4:5555".into()))
            .unwrap();
        store.close().unwrap();
        let second = fs::read(store.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            fs::metadata(store.path()).unwrap().modified().unwrap(),
            mtime,
            "unchanged settings are not rewritten"
        );

        store.open(Access::ReadOnly).unwrap();
        assert_eq!(
            store.get(SERVER).unwrap(),
            Some(SettingValue::Text("1.2.3.4:5555".into()))
        );
        store.close().unwrap();
    }

    #[test]
    fn deleting_server_drops_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        store.open(Access::ReadWrite).unwrap();
        store.set(ENABLED, SettingValue::Flag(true)).unwrap();
        store.set(SERVER, SettingValue::Text("h:1".into())).unwrap();
        store.close().unwrap();

        store.open(Access::ReadWrite).unwrap();
        store.set(ENABLED, SettingValue::Flag(false)).unwrap();
        store.delete(SERVER).unwrap();
        store.delete(SERVER).unwrap();
        assert!(matches!(
            store.delete(ENABLED),
            Err(StoreError::Unsupported { .. })
        ));
        store.close().unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(!text.contains("server"), "unexpected content: {text}");
    }

    #[test]
    fn failed_write_names_the_key_and_keeps_the_old_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileProxyStore::new(dir.path().join("sub").join("system_proxy.json"));
        store.open(Access::ReadWrite).unwrap();

        // A plain file where the parent directory should be.
        fs::write(dir.path().join("sub"), "").unwrap();

        let err = store.set(ENABLED, SettingValue::Flag(true)).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "got {err:?}");
        assert!(err.to_string().contains(ENABLED), "unexpected message: {err}");
        assert_eq!(store.get(ENABLED).unwrap(), Some(SettingValue::Flag(false)));
        store.close().unwrap();
    }
}
