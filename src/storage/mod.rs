//! Storage capabilities consumed by the ingestion pipeline, and their in-memory
//! implementations.

mod addresses;
mod transactions;

pub use addresses::AddressesMapStorage;
pub use transactions::TransactionsMapStorage;

use crate::{error::StorageError, types::Transaction};
use auto_impl::auto_impl;

pub(crate) const INITIAL_STORAGE_CAP: usize = 1024;

/// Address-keyed log of matched transactions.
#[auto_impl(Arc)]
pub trait TransactionStorage: Send + Sync + 'static {
    fn init(&self) -> Result<(), StorageError>;
    fn shutdown(&self) -> Result<(), StorageError>;

    /// Appends `transaction` to the log of `address`.
    fn store(&self, address: &str, transaction: Transaction) -> Result<(), StorageError>;

    /// Returns the log of `address` in recorded order.
    fn get(&self, address: &str) -> Result<Vec<Transaction>, StorageError>;
}

/// Set of watched addresses.
#[auto_impl(Arc)]
pub trait AddressStorage: Send + Sync + 'static {
    fn init(&self) -> Result<(), StorageError>;
    fn shutdown(&self) -> Result<(), StorageError>;

    /// Adds `address`; storing an address twice is a no-op.
    fn store(&self, address: &str) -> Result<(), StorageError>;

    fn check(&self, address: &str) -> bool;
}
