use std::env;

use log::debug;

use super::errors::StoreError;
use super::keyed_store::{Access, KeyedStore};

const STORE: &str = "environment";

/// Exposes the process environment as a keyed store.
///
/// Writes take effect immediately for this process and the children it
/// spawns afterwards. There is nothing to persist and nothing to roll back.
#[derive(Debug, Default)]
pub struct EnvironmentStore {
    access: Option<Access>,
}

impl EnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn writable(&self, operation: &str) -> Result<(), StoreError> {
        match self.access {
            Some(Access::ReadWrite) => Ok(()),
            Some(Access::ReadOnly) => Err(StoreError::unsupported(
                STORE,
                format!("{operation} through a read-only handle"),
            )),
            None => Err(StoreError::unsupported(
                STORE,
                format!("{operation} before open"),
            )),
        }
    }
}

/// `std::env::set_var` panics on these, so reject them up front.
fn check_name(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return Err(StoreError::type_kind(
            STORE,
            key,
            "a variable name without '=' or NUL",
        ));
    }
    Ok(())
}

impl KeyedStore for EnvironmentStore {
    type Key = str;
    type Value = String;

    fn name(&self) -> &'static str {
        STORE
    }

    fn open(&mut self, access: Access) -> Result<(), StoreError> {
        self.access = Some(access);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.access = None;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_name(key)?;
        match env::var_os(key) {
            None => Ok(None),
            Some(value) => value
                .into_string()
                .map(Some)
                .map_err(|_| StoreError::type_kind(STORE, key, "valid unicode")),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.writable("set")?;
        check_name(key)?;
        if value.contains('\0') {
            return Err(StoreError::type_kind(STORE, key, "a value without NUL"));
        }
        debug!("env: {key} set");
        env::set_var(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.writable("delete")?;
        check_name(key)?;
        debug!("env: {key} removed");
        env::remove_var(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(env::vars_os()
            .map(|(key, _)| key.to_string_lossy().into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_reads_as_absent() {
        let store = EnvironmentStore::new();
        let value = store
            .get("PROXYBOX_TEST_NEVER_SET_4F1A")
            .expect("get should succeed");
        assert_eq!(value, None);
    }

    #[test]
    fn set_delete_and_enumerate() {
        let mut store = EnvironmentStore::new();
        store.open(Access::ReadWrite).unwrap();

        store
            .set("PROXYBOX_TEST_SET_DELETE", "http://h:1".into())
            .unwrap();
        assert_eq!(
            store.get("PROXYBOX_TEST_SET_DELETE").unwrap().as_deref(),
            Some("http://h:1")
        );
        assert!(store
            .keys()
            .unwrap()
            .iter()
            .any(|k| k == "PROXYBOX_TEST_SET_DELETE"));

        store.delete("PROXYBOX_TEST_SET_DELETE").unwrap();
        // Deleting twice is fine.
        store.delete("PROXYBOX_TEST_SET_DELETE").unwrap();
        assert_eq!(store.get("PROXYBOX_TEST_SET_DELETE").unwrap(), None);

        store.close().unwrap();
    }

    #[test]
    fn read_only_handle_refuses_writes() {
        let mut store = EnvironmentStore::new();
        store.open(Access::ReadOnly).unwrap();
        let err = store
            .set("PROXYBOX_TEST_READ_ONLY", "x".into())
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
        assert_eq!(store.get("PROXYBOX_TEST_READ_ONLY").unwrap(), None);
    }

    #[test]
    fn invalid_names_are_type_errors() {
        let mut store = EnvironmentStore::new();
        store.open(Access::ReadWrite).unwrap();
        let err = store.set("A=B", "x".into()).unwrap_err();
        assert!(matches!(err, StoreError::TypeKind { .. }));
    }
}
