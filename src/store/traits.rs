//! Repository traits for the engine's system of record
//!
//! The engine owns no storage directly; it speaks to these traits so a
//! persistent, transactionally-safe store can be substituted without
//! touching business logic. The closure-based `update` is the write
//! path's concurrency contract: the implementation must run the closure
//! with exclusive access to the record, so status preconditions checked
//! inside the closure still hold when the new state is written. If the
//! closure returns an error the record must be left untouched.

use crate::types::{
    CustomerId, DisputeId, EngineError, ItemFilter, ItemId, P2PDispute, P2PMarketplaceItem,
    P2PTransaction, TransactionId,
};

/// Storage for transactions
pub trait TransactionRepository: Send + Sync {
    /// Insert a new transaction; ids are engine-allocated and unique
    fn insert(&self, transaction: P2PTransaction);

    /// Snapshot of a transaction by id
    fn get(&self, id: TransactionId) -> Option<P2PTransaction>;

    /// Mutate a transaction under its record lock
    ///
    /// Returns the updated snapshot, or `TransactionNotFound` /
    /// the closure's error with the record unchanged.
    fn update<F>(&self, id: TransactionId, f: F) -> Result<P2PTransaction, EngineError>
    where
        F: FnOnce(&mut P2PTransaction) -> Result<(), EngineError>;

    /// All transactions where the customer is either party
    fn for_customer(&self, customer: CustomerId) -> Vec<P2PTransaction>;

    /// Snapshot of every transaction
    fn all(&self) -> Vec<P2PTransaction>;
}

/// Storage for disputes
pub trait DisputeRepository: Send + Sync {
    fn insert(&self, dispute: P2PDispute);

    fn get(&self, id: DisputeId) -> Option<P2PDispute>;

    /// Mutate a dispute under its record lock (same contract as
    /// [`TransactionRepository::update`])
    fn update<F>(&self, id: DisputeId, f: F) -> Result<P2PDispute, EngineError>
    where
        F: FnOnce(&mut P2PDispute) -> Result<(), EngineError>;

    /// All disputes where the customer is initiator or respondent
    fn for_customer(&self, customer: CustomerId) -> Vec<P2PDispute>;

    fn all(&self) -> Vec<P2PDispute>;
}

/// Storage for marketplace listings
pub trait ItemRepository: Send + Sync {
    fn insert(&self, item: P2PMarketplaceItem);

    fn get(&self, id: ItemId) -> Option<P2PMarketplaceItem>;

    /// Mutate a listing under its record lock (same contract as
    /// [`TransactionRepository::update`])
    fn update<F>(&self, id: ItemId, f: F) -> Result<P2PMarketplaceItem, EngineError>
    where
        F: FnOnce(&mut P2PMarketplaceItem) -> Result<(), EngineError>;

    /// Listings matching the filter
    fn query(&self, filter: &ItemFilter) -> Vec<P2PMarketplaceItem>;
}
