use super::{AddressStorage, INITIAL_STORAGE_CAP};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug)]
struct Addresses {
    closed: bool,
    set: HashSet<String>,
}

/// In-memory subscription set guarded by a single read-write lock.
#[derive(Debug)]
pub struct AddressesMapStorage {
    storage: RwLock<Addresses>,
}

impl Default for AddressesMapStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressesMapStorage {
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(Addresses {
                closed: false,
                set: HashSet::with_capacity(INITIAL_STORAGE_CAP),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.read().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AddressStorage for AddressesMapStorage {
    fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn shutdown(&self) -> Result<(), StorageError> {
        self.storage.write().closed = true;
        Ok(())
    }

    fn store(&self, address: &str) -> Result<(), StorageError> {
        let mut storage = self.storage.write();
        if storage.closed {
            return Err(StorageError::Closed);
        }
        if !storage.set.contains(address) {
            storage.set.insert(address.to_owned());
        }
        Ok(())
    }

    fn check(&self, address: &str) -> bool {
        let storage = self.storage.read();
        !storage.closed && storage.set.contains(address)
    }
}
