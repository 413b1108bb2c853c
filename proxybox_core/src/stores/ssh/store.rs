use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::config::{HostFields, SshConfig};
use crate::stores::errors::StoreError;
use crate::stores::keyed_store::{Access, KeyedStore};
use crate::utils::fs::{read_optional, write_atomic};

const STORE: &str = "ssh config";

/// Identifies one `Host` block.
///
/// The alias alone is not enough: a file may repeat the same alias, and each
/// block is edited on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostId {
    pub index: usize,
    pub alias: String,
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.alias, self.index)
    }
}

/// `Host` blocks of an SSH client config file, keyed by [`HostId`].
///
/// The file is parsed on open. On close the in-memory config is written to
/// the output path, which may differ from the input path so a run can be
/// inspected before it replaces the real file. It is written on every close,
/// even when nothing was changed.
#[derive(Debug)]
pub struct SshConfigStore {
    input: PathBuf,
    output: PathBuf,
    config: Option<SshConfig>,
}

impl SshConfigStore {
    /// Read and write the same file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::with_output(path.clone(), path)
    }

    pub fn with_output(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: None,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn config(&self, operation: &str) -> Result<&SshConfig, StoreError> {
        self.config
            .as_ref()
            .ok_or_else(|| StoreError::unsupported(STORE, format!("{operation} before open")))
    }

    fn config_mut(&mut self, operation: &str) -> Result<&mut SshConfig, StoreError> {
        self.config
            .as_mut()
            .ok_or_else(|| StoreError::unsupported(STORE, format!("{operation} before open")))
    }
}

impl KeyedStore for SshConfigStore {
    type Key = HostId;
    type Value = HostFields;

    fn name(&self) -> &'static str {
        STORE
    }

    fn open(&mut self, _access: Access) -> Result<(), StoreError> {
        let text = read_optional(&self.input)
            .map_err(|e| StoreError::io(STORE, e).with_key(self.input.display().to_string()))?
            .unwrap_or_default();
        let config = SshConfig::parse(&text);
        debug!(
            "Parsed {} host block(s) from {:?}",
            config.hosts().len(),
            self.input
        );
        self.config = Some(config);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let Some(config) = self.config.take() else {
            return Ok(());
        };
        info!("Writing SSH config to {:?}", self.output);
        write_atomic(&self.output, config.render().as_bytes())
            .map_err(|e| StoreError::io(STORE, e).with_key(self.output.display().to_string()))
    }

    fn get(&self, key: &HostId) -> Result<Option<HostFields>, StoreError> {
        Ok(self.config("get")?.fields(key.index, &key.alias))
    }

    /// Replace the fields of an existing block. Creating blocks is not
    /// supported.
    fn set(&mut self, key: &HostId, value: HostFields) -> Result<(), StoreError> {
        let config = self.config_mut("set")?;
        if config.apply_fields(key.index, &key.alias, &value) {
            debug!("Updated host {key}");
            Ok(())
        } else {
            Err(StoreError::unsupported(
                STORE,
                format!("creating host block '{}'", key.alias),
            ))
        }
    }

    fn delete(&mut self, key: &HostId) -> Result<(), StoreError> {
        if self.config_mut("delete")?.remove_host(key.index, &key.alias) {
            debug!("Removed host {key}");
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<HostId>, StoreError> {
        Ok(self
            .config("keys")?
            .hosts()
            .into_iter()
            .map(|(index, alias)| HostId { index, alias })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = "Host gl\n    HostName gitlab.com\n    User git\n\nHost other\n    HostName example.org\n";

    #[test]
    fn close_writes_even_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("config");
        let output = dir.path().join("config.out");
        fs::write(&input, CONFIG).unwrap();

        let mut store = SshConfigStore::with_output(&input, &output);
        store.open(Access::ReadWrite).unwrap();
        assert_eq!(store.keys().unwrap().len(), 2);
        store.close().unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), CONFIG);
        assert_eq!(fs::read_to_string(&input).unwrap(), CONFIG);
    }

    #[test]
    fn set_rewrites_block_and_rejects_unknown_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, CONFIG).unwrap();

        let mut store = SshConfigStore::new(&path);
        store.open(Access::ReadWrite).unwrap();

        let gl = store.keys().unwrap().remove(0);
        let mut fields = store.get(&gl).unwrap().expect("host should exist");
        fields.set("User", "me");
        store.set(&gl, fields).unwrap();

        let missing = HostId {
            index: 7,
            alias: "missing".into(),
        };
        assert_eq!(store.get(&missing).unwrap(), None);
        let err = store.set(&missing, HostFields::new()).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));

        store.close().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            CONFIG.replace("User git", "User me")
        );
    }

    #[test]
    fn delete_removes_whole_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, CONFIG).unwrap();

        let mut store = SshConfigStore::new(&path);
        store.open(Access::ReadWrite).unwrap();
        let other = store.keys().unwrap().remove(1);
        store.delete(&other).unwrap();
        store.delete(&other).unwrap();
        store.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Host gl\n    HostName gitlab.com\n    User git\n\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_config_is_edited_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("dotfiles_config");
        let link = dir.path().join("config");
        fs::write(&real, CONFIG).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut store = SshConfigStore::new(&link);
        store.open(Access::ReadWrite).unwrap();
        let gl = store.keys().unwrap().remove(0);
        let mut fields = store.get(&gl).unwrap().expect("host should exist");
        fields.set("Port", "443");
        store.set(&gl, fields).unwrap();
        store.close().unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(fs::read_to_string(&real).unwrap().contains("    Port 443\n"));
    }

    #[test]
    fn missing_file_is_an_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SshConfigStore::new(dir.path().join(".ssh").join("config"));
        store.open(Access::ReadWrite).unwrap();
        assert!(store.keys().unwrap().is_empty());
        store.close().unwrap();
    }

    #[test]
    fn use_before_open_is_unsupported() {
        let store = SshConfigStore::new("/nonexistent/config");
        assert!(matches!(store.keys(), Err(StoreError::Unsupported { .. })));
    }
}
