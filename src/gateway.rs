//! External collaborator interfaces
//!
//! The engine consults three external systems and owns none of them: the
//! customer directory, the balance authority, and the notification
//! dispatcher. Each is a trait so the application layer can plug in its
//! real implementation; the in-memory implementations in this module
//! back tests and local development.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::types::{CustomerId, NotificationKind};

/// Account status reported by the customer directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Closed,
}

/// Profile fields the engine needs from the customer directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer: CustomerId,
    pub account_status: AccountStatus,
    pub registered_at: DateTime<Utc>,
    /// Directory-reported risk score; the scorer substitutes a default
    /// when absent
    pub risk_score: Option<u32>,
}

/// Read-only lookup against the external customer directory
pub trait ParticipantGateway: Send + Sync {
    fn profile(&self, customer: CustomerId) -> Option<CustomerProfile>;

    fn is_active(&self, customer: CustomerId) -> bool {
        self.profile(customer)
            .is_some_and(|p| p.account_status == AccountStatus::Active)
    }
}

/// Read-only lookup against the external ledger/balance system
pub trait BalanceAuthority: Send + Sync {
    /// Available balance; unknown customers report zero
    fn available_balance(&self, customer: CustomerId) -> Decimal;
}

/// Fire-and-forget notification delivery
///
/// Delivery failures are the dispatcher's problem; the engine records
/// the attempt on the transaction and never retries.
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, recipient: CustomerId, kind: NotificationKind, message: &str);
}

/// In-memory customer directory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: DashMap<CustomerId, CustomerProfile>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: CustomerProfile) {
        self.profiles.insert(profile.customer, profile);
    }
}

impl ParticipantGateway for InMemoryDirectory {
    fn profile(&self, customer: CustomerId) -> Option<CustomerProfile> {
        self.profiles.get(&customer).map(|p| p.clone())
    }
}

/// In-memory balance table
#[derive(Debug, Default)]
pub struct InMemoryBalances {
    balances: DashMap<CustomerId, Decimal>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, customer: CustomerId, balance: Decimal) {
        self.balances.insert(customer, balance);
    }
}

impl BalanceAuthority for InMemoryBalances {
    fn available_balance(&self, customer: CustomerId) -> Decimal {
        self.balances
            .get(&customer)
            .map(|b| *b)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Dispatcher that records every notification it is asked to send
///
/// Used by tests to assert on delivery without a real channel.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<(CustomerId, NotificationKind, String)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<(CustomerId, NotificationKind, String)> {
        self.sent.lock().expect("dispatcher lock poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(&self, recipient: CustomerId, kind: NotificationKind, message: &str) {
        self.sent
            .lock()
            .expect("dispatcher lock poisoned")
            .push((recipient, kind, message.to_string()));
    }
}

/// Dispatcher that drops everything
#[derive(Debug, Default)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn send(&self, _recipient: CustomerId, _kind: NotificationKind, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_reports_active_status() {
        let directory = InMemoryDirectory::new();
        directory.upsert(CustomerProfile {
            customer: 1,
            account_status: AccountStatus::Active,
            registered_at: Utc::now(),
            risk_score: Some(20),
        });
        directory.upsert(CustomerProfile {
            customer: 2,
            account_status: AccountStatus::Suspended,
            registered_at: Utc::now(),
            risk_score: None,
        });

        assert!(directory.is_active(1));
        assert!(!directory.is_active(2));
        assert!(!directory.is_active(3));
    }

    #[test]
    fn unknown_customer_has_zero_balance() {
        let balances = InMemoryBalances::new();
        assert_eq!(balances.available_balance(1), Decimal::ZERO);

        balances.set(1, Decimal::from(250));
        assert_eq!(balances.available_balance(1), Decimal::from(250));
    }

    #[test]
    fn recording_dispatcher_keeps_order() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.send(1, NotificationKind::TransactionCreated, "created");
        dispatcher.send(2, NotificationKind::PaymentReceived, "paid");

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, 1);
        assert_eq!(sent[1].1, NotificationKind::PaymentReceived);
    }
}
