//! DashMap-backed in-memory repositories
//!
//! `DashMap` gives each record fine-grained locking: `update` holds the
//! entry's shard lock for the duration of the closure, so exactly one
//! state-mutating operation per record proceeds at a time and a status
//! precondition verified inside the closure still holds at write time.
//!
//! The closure runs against a draft clone and the draft is committed
//! only on `Ok`, so a rejected operation never leaves a partial
//! mutation behind.

use dashmap::DashMap;

use crate::store::traits::{DisputeRepository, ItemRepository, TransactionRepository};
use crate::types::{
    CustomerId, DisputeId, EngineError, ItemFilter, ItemId, P2PDispute, P2PMarketplaceItem,
    P2PTransaction, TransactionId,
};

/// In-memory transaction store
#[derive(Debug, Default)]
pub struct InMemoryTransactions {
    records: DashMap<TransactionId, P2PTransaction>,
}

impl InMemoryTransactions {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionRepository for InMemoryTransactions {
    fn insert(&self, transaction: P2PTransaction) {
        self.records.insert(transaction.id, transaction);
    }

    fn get(&self, id: TransactionId) -> Option<P2PTransaction> {
        self.records.get(&id).map(|t| t.clone())
    }

    fn update<F>(&self, id: TransactionId, f: F) -> Result<P2PTransaction, EngineError>
    where
        F: FnOnce(&mut P2PTransaction) -> Result<(), EngineError>,
    {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(EngineError::TransactionNotFound { transaction: id })?;
        let mut draft = entry.value().clone();
        f(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    fn for_customer(&self, customer: CustomerId) -> Vec<P2PTransaction> {
        self.records
            .iter()
            .filter(|t| t.involves(customer))
            .map(|t| t.clone())
            .collect()
    }

    fn all(&self) -> Vec<P2PTransaction> {
        self.records.iter().map(|t| t.clone()).collect()
    }
}

/// In-memory dispute store
#[derive(Debug, Default)]
pub struct InMemoryDisputes {
    records: DashMap<DisputeId, P2PDispute>,
}

impl InMemoryDisputes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisputeRepository for InMemoryDisputes {
    fn insert(&self, dispute: P2PDispute) {
        self.records.insert(dispute.id, dispute);
    }

    fn get(&self, id: DisputeId) -> Option<P2PDispute> {
        self.records.get(&id).map(|d| d.clone())
    }

    fn update<F>(&self, id: DisputeId, f: F) -> Result<P2PDispute, EngineError>
    where
        F: FnOnce(&mut P2PDispute) -> Result<(), EngineError>,
    {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(EngineError::DisputeNotFound { dispute: id })?;
        let mut draft = entry.value().clone();
        f(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    fn for_customer(&self, customer: CustomerId) -> Vec<P2PDispute> {
        self.records
            .iter()
            .filter(|d| d.involves(customer))
            .map(|d| d.clone())
            .collect()
    }

    fn all(&self) -> Vec<P2PDispute> {
        self.records.iter().map(|d| d.clone()).collect()
    }
}

/// In-memory marketplace listing store
#[derive(Debug, Default)]
pub struct InMemoryItems {
    records: DashMap<ItemId, P2PMarketplaceItem>,
}

impl InMemoryItems {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemRepository for InMemoryItems {
    fn insert(&self, item: P2PMarketplaceItem) {
        self.records.insert(item.id, item);
    }

    fn get(&self, id: ItemId) -> Option<P2PMarketplaceItem> {
        self.records.get(&id).map(|i| i.clone())
    }

    fn update<F>(&self, id: ItemId, f: F) -> Result<P2PMarketplaceItem, EngineError>
    where
        F: FnOnce(&mut P2PMarketplaceItem) -> Result<(), EngineError>,
    {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(EngineError::ItemNotFound { item: id })?;
        let mut draft = entry.value().clone();
        f(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    fn query(&self, filter: &ItemFilter) -> Vec<P2PMarketplaceItem> {
        self.records
            .iter()
            .filter(|i| i.matches(filter))
            .map(|i| i.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DisputePriority, DisputeReason, DisputeStatus, RiskAssessment, TransactionStatus,
        TransactionType,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn transaction(id: TransactionId) -> P2PTransaction {
        P2PTransaction {
            id,
            tx_type: TransactionType::DirectTransfer,
            sender: 1,
            receiver: 2,
            amount: Decimal::from(100),
            fee: Decimal::ZERO,
            net_amount: Decimal::from(100),
            currency: "USD".to_string(),
            description: String::new(),
            status: TransactionStatus::Pending,
            escrow: None,
            marketplace: None,
            service: None,
            loan: None,
            risk: RiskAssessment {
                sender_score: 50,
                receiver_score: 50,
                transaction_score: 0,
                overall_score: 33.0,
                flagged: false,
                flags: vec![],
            },
            dispute: None,
            messages: vec![],
            audit_trail: vec![],
            notifications: vec![],
            external_reference: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let store = InMemoryTransactions::new();
        store.insert(transaction(1));

        let found = store.get(1).expect("stored transaction");
        assert_eq!(found.id, 1);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn update_commits_on_ok() {
        let store = InMemoryTransactions::new();
        store.insert(transaction(1));

        let updated = store
            .update(1, |t| {
                t.status = TransactionStatus::Processing;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.status, TransactionStatus::Processing);
        assert_eq!(store.get(1).unwrap().status, TransactionStatus::Processing);
    }

    #[test]
    fn update_rolls_back_on_error() {
        let store = InMemoryTransactions::new();
        store.insert(transaction(1));

        let result = store.update(1, |t| {
            // Mutate before failing: the draft must be discarded.
            t.status = TransactionStatus::Completed;
            Err(EngineError::SelfTransfer { customer: 1 })
        });

        assert!(result.is_err());
        assert_eq!(store.get(1).unwrap().status, TransactionStatus::Pending);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let store = InMemoryTransactions::new();
        let result = store.update(99, |_| Ok(()));
        assert_eq!(
            result.unwrap_err(),
            EngineError::TransactionNotFound { transaction: 99 }
        );
    }

    #[test]
    fn for_customer_matches_either_party() {
        let store = InMemoryTransactions::new();
        store.insert(transaction(1));
        let mut other = transaction(2);
        other.sender = 3;
        other.receiver = 4;
        store.insert(other);

        assert_eq!(store.for_customer(1).len(), 1);
        assert_eq!(store.for_customer(2).len(), 1);
        assert_eq!(store.for_customer(4).len(), 1);
        assert!(store.for_customer(9).is_empty());
    }

    #[test]
    fn dispute_store_round_trip() {
        let store = InMemoryDisputes::new();
        store.insert(P2PDispute {
            id: 1,
            transaction_id: 10,
            initiated_by: 1,
            respondent: 2,
            reason: DisputeReason::ItemNotReceived,
            description: "never arrived".to_string(),
            priority: DisputePriority::Medium,
            status: DisputeStatus::Open,
            evidence: vec![],
            messages: vec![],
            resolution: None,
            created_at: Utc::now(),
        });

        assert!(store.get(1).is_some());
        assert_eq!(store.for_customer(2).len(), 1);
        assert!(store.for_customer(3).is_empty());
    }
}
