use std::ops::{Deref, DerefMut};

use log::{debug, error};

use super::errors::StoreError;

/// How much a caller is allowed to do with an opened store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn can_write(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// A trait representing a generic keyed configuration backend
/// (system proxy settings, environment, SSH config, profiles).
///
/// A store is passive until [`KeyedStore::open`] is called and must be
/// released with [`KeyedStore::close`] exactly once afterwards. Use
/// [`Scoped::open`] rather than calling the pair by hand.
pub trait KeyedStore {
    /// Borrowed key type (`str` for most stores).
    type Key: ?Sized + ToOwned;
    type Value;

    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    fn open(&mut self, access: Access) -> Result<(), StoreError>;
    fn close(&mut self) -> Result<(), StoreError>;

    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, StoreError>;
    fn set(&mut self, key: &Self::Key, value: Self::Value) -> Result<(), StoreError>;
    /// Removing an absent key is a no-op.
    fn delete(&mut self, key: &Self::Key) -> Result<(), StoreError>;
    /// A fresh snapshot of the keys currently present.
    fn keys(&self) -> Result<Vec<<Self::Key as ToOwned>::Owned>, StoreError>;
}

/// An opened store that is closed again when it goes out of scope.
///
/// [`Scoped::close`] surfaces the close error to the caller; if the guard is
/// dropped instead (early return through `?`), the store is still closed and
/// a failure is only logged.
pub struct Scoped<'a, S: KeyedStore + ?Sized> {
    store: &'a mut S,
    closed: bool,
}

impl<'a, S: KeyedStore + ?Sized> Scoped<'a, S> {
    pub fn open(store: &'a mut S, access: Access) -> Result<Self, StoreError> {
        debug!("Opening {} store ({:?})", store.name(), access);
        store.open(access)?;
        Ok(Self {
            store,
            closed: false,
        })
    }

    pub fn close(mut self) -> Result<(), StoreError> {
        self.closed = true;
        debug!("Closing {} store", self.store.name());
        self.store.close()
    }
}

impl<S: KeyedStore + ?Sized> Deref for Scoped<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.store
    }
}

impl<S: KeyedStore + ?Sized> DerefMut for Scoped<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.store
    }
}

impl<S: KeyedStore + ?Sized> Drop for Scoped<'_, S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        debug!("Closing {} store on early exit", self.store.name());
        if let Err(e) = self.store.close() {
            error!("Failed to close {} store: {}", self.store.name(), e);
        }
    }
}
