use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Error as SerdeError;

use crate::stores::errors::StoreError;
use crate::stores::keyed_store::{Access, KeyedStore};
use crate::utils::fs::{read_optional, write_atomic};

const STORE: &str = "profiles";

/// Saved proxy URIs, one flat JSON object:
/// `{ "work": "http://proxy.corp:8080", "home": "http://10.0.0.1:3128" }`.
///
/// Every call reads the document fresh and every write replaces it
/// atomically, so a crash mid-write never loses existing profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored profile, sorted by name. A missing file is empty.
    pub fn list(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let Some(text) = read_optional(&self.path).map_err(|e| StoreError::io(STORE, e))? else {
            return Ok(BTreeMap::new());
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::io(STORE, SerdeError::into(e)))
    }

    fn save(&self, profiles: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(profiles)
            .map_err(|e| StoreError::io(STORE, io::Error::from(e)))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| StoreError::io(STORE, e))
    }

    /// Drop every profile.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        debug!("Clearing all profiles in {:?}", self.path);
        self.save(&BTreeMap::new())
    }
}

impl KeyedStore for ProfileStore {
    type Key = str;
    type Value = String;

    fn name(&self) -> &'static str {
        STORE
    }

    fn open(&mut self, _access: Access) -> Result<(), StoreError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.list()?.remove(key))
    }

    /// Create or overwrite a profile.
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut profiles = self.list()?;
        profiles.insert(key.to_string(), value);
        self.save(&profiles).map_err(|e| e.with_key(key))
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let mut profiles = self.list()?;
        if profiles.remove(key).is_none() {
            warn!("No profile named '{key}' to delete");
            return Ok(());
        }
        self.save(&profiles).map_err(|e| e.with_key(key))
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_keys().collect())
    }
}
