use super::{TransactionStorage, INITIAL_STORAGE_CAP};
use crate::{error::StorageError, types::Transaction};
use parking_lot::RwLock;
use std::collections::HashMap;

const INITIAL_TRANSACTIONS_PER_ADDRESS_CAP: usize = 16;

#[derive(Debug)]
struct Log {
    closed: bool,
    map: HashMap<String, Vec<Transaction>>,
}

/// In-memory transaction log guarded by a single read-write lock.
///
/// With `reset_after_get` (consume-on-read) a read hands out the address's entries and
/// clears them in the same critical section, so nothing appended concurrently is lost.
#[derive(Debug)]
pub struct TransactionsMapStorage {
    storage: RwLock<Log>,
    reset_after_get: bool,
}

impl TransactionsMapStorage {
    pub fn new(reset_after_get: bool) -> Self {
        Self {
            storage: RwLock::new(Log {
                closed: false,
                map: HashMap::with_capacity(INITIAL_STORAGE_CAP),
            }),
            reset_after_get,
        }
    }

    pub fn reset_after_get(&self) -> bool {
        self.reset_after_get
    }
}

impl TransactionStorage for TransactionsMapStorage {
    fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn shutdown(&self) -> Result<(), StorageError> {
        self.storage.write().closed = true;
        Ok(())
    }

    fn store(&self, address: &str, transaction: Transaction) -> Result<(), StorageError> {
        let mut storage = self.storage.write();
        if storage.closed {
            return Err(StorageError::Closed);
        }
        match storage.map.get_mut(address) {
            Some(transactions) => transactions.push(transaction),
            None => {
                let mut transactions = Vec::with_capacity(INITIAL_TRANSACTIONS_PER_ADDRESS_CAP);
                transactions.push(transaction);
                storage.map.insert(address.to_owned(), transactions);
            }
        }
        Ok(())
    }

    fn get(&self, address: &str) -> Result<Vec<Transaction>, StorageError> {
        if self.reset_after_get {
            let mut storage = self.storage.write();
            if storage.closed {
                return Err(StorageError::Closed);
            }
            return Ok(storage.map.remove(address).unwrap_or_default());
        }

        let storage = self.storage.read();
        if storage.closed {
            return Err(StorageError::Closed);
        }
        Ok(storage.map.get(address).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str) -> Transaction {
        Transaction::new(hash, "from", "to")
    }

    #[test]
    fn test_get_keeps_order() {
        let storage = TransactionsMapStorage::new(false);
        assert!(storage.get("a").unwrap().is_empty());

        storage.store("a", tx("h1")).unwrap();
        storage.store("b", tx("h2")).unwrap();
        storage.store("a", tx("h3")).unwrap();

        assert_eq!(storage.get("a").unwrap(), vec![tx("h1"), tx("h3")]);
        assert_eq!(storage.get("a").unwrap(), vec![tx("h1"), tx("h3")]);
        assert_eq!(storage.get("b").unwrap(), vec![tx("h2")]);
    }

    #[test]
    fn test_consume_on_read() {
        let storage = TransactionsMapStorage::new(true);
        assert!(storage.reset_after_get());
        storage.store("a", tx("h1")).unwrap();
        storage.store("a", tx("h2")).unwrap();
        storage.store("b", tx("h3")).unwrap();

        assert_eq!(storage.get("a").unwrap(), vec![tx("h1"), tx("h2")]);
        assert!(storage.get("a").unwrap().is_empty());

        storage.store("a", tx("h4")).unwrap();
        assert_eq!(storage.get("a").unwrap(), vec![tx("h4")]);
        assert_eq!(storage.get("b").unwrap(), vec![tx("h3")]);
    }

    #[test]
    fn test_closed_after_shutdown() {
        let storage = TransactionsMapStorage::new(false);
        storage.store("a", tx("h1")).unwrap();
        storage.shutdown().unwrap();

        assert_eq!(storage.store("a", tx("h2")), Err(StorageError::Closed));
        assert_eq!(storage.get("a"), Err(StorageError::Closed));
    }

    #[test]
    fn test_consume_on_read_loses_nothing_under_concurrency() {
        let storage = std::sync::Arc::new(TransactionsMapStorage::new(true));
        let writer = {
            let storage = storage.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    storage.store("a", tx(&format!("h{i}"))).unwrap();
                }
            })
        };

        let mut seen = Vec::new();
        while !writer.is_finished() {
            seen.extend(storage.get("a").unwrap());
        }
        writer.join().unwrap();
        seen.extend(storage.get("a").unwrap());

        let expected = (0..2000).map(|i| tx(&format!("h{i}"))).collect::<Vec<_>>();
        assert_eq!(seen, expected);
    }
}
