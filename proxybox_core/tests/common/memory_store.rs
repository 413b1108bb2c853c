//! A deterministic **in‑memory stand‑in** for any `KeyedStore` with string
//! keys.
//!
//! *  Lets the service manager tests run without touching the real process
//!    environment, which is shared by every test thread.
//! *  Counts opens / closes so tests can check scoped release.

#![allow(dead_code)]

use std::collections::BTreeMap;

use proxybox_core::stores::{Access, KeyedStore, StoreError};

pub struct MemoryStore<V> {
    pub values: BTreeMap<String, V>,
    pub opens: usize,
    pub closes: usize,
    /// Keys whose `set` fails with an IO error (simulates an unwritable store).
    pub fail_on_set: Vec<String>,
    access: Option<Access>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            opens: 0,
            closes: 0,
            fail_on_set: Vec::new(),
            access: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.access.is_some()
    }
}

impl<V: Clone> KeyedStore for MemoryStore<V> {
    type Key = str;
    type Value = V;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&mut self, access: Access) -> Result<(), StoreError> {
        assert!(self.access.is_none(), "store opened twice");
        self.access = Some(access);
        self.opens += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        assert!(self.access.is_some(), "store closed without being open");
        self.access = None;
        self.closes += 1;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: V) -> Result<(), StoreError> {
        assert_eq!(self.access, Some(Access::ReadWrite), "write without write access");
        if self.fail_on_set.iter().any(|k| k == key) {
            return Err(StoreError::io(
                "memory",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            )
            .with_key(key));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        assert_eq!(self.access, Some(Access::ReadWrite), "write without write access");
        self.values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.values.keys().cloned().collect())
    }
}
