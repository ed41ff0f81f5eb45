//! A peer-to-peer transaction and escrow settlement engine
//!
//! This crate models the full lifecycle of value movement between two
//! customers: direct transfers, escrowed deals, marketplace sales,
//! service payments, and loan repayments. Every transaction is a
//! permanent ledger record driven through an explicit status state
//! machine, carries a risk assessment computed at creation, and
//! accumulates an append-only history of messages, audit entries, and
//! notifications.
//!
//! The engine does not move money itself. It consults three external
//! collaborators through traits: a [`gateway::ParticipantGateway`] for
//! customer profiles, a [`gateway::BalanceAuthority`] for available
//! balances, and a [`gateway::NotificationDispatcher`] for outbound
//! notices. In-memory implementations of all three ship with the crate
//! for embedding and testing.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use rust_decimal::Decimal;
//! use p2p_settlement_engine::{
//!     EngineConfig, SettlementEngine, TransactionRequest, TransactionStatus, TransactionType,
//! };
//! use p2p_settlement_engine::gateway::{
//!     AccountStatus, CustomerProfile, InMemoryBalances, InMemoryDirectory, NullDispatcher,
//! };
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! let balances = Arc::new(InMemoryBalances::new());
//! for customer in [1, 2] {
//!     directory.upsert(CustomerProfile {
//!         customer,
//!         account_status: AccountStatus::Active,
//!         registered_at: Utc::now() - Duration::days(90),
//!         risk_score: None,
//!     });
//!     balances.set(customer, Decimal::from(1_000));
//! }
//!
//! let engine = SettlementEngine::new(
//!     directory,
//!     balances,
//!     Arc::new(NullDispatcher),
//!     EngineConfig::default(),
//! );
//!
//! let transaction = engine
//!     .create_transaction(TransactionRequest {
//!         sender: 1,
//!         receiver: 2,
//!         amount: Decimal::from(250),
//!         fee: Decimal::ZERO,
//!         currency: "USD".to_string(),
//!         tx_type: TransactionType::DirectTransfer,
//!         description: "rent share".to_string(),
//!         marketplace: None,
//!         service: None,
//!         loan: None,
//!         external_reference: None,
//!     })
//!     .unwrap();
//! assert_eq!(transaction.status, TransactionStatus::Pending);
//!
//! engine.begin_processing(transaction.id).unwrap();
//! let settled = engine.complete_transaction(transaction.id).unwrap();
//! assert_eq!(settled.status, TransactionStatus::Completed);
//! ```
//!
//! # Architecture
//!
//! - [`types`] - the transaction, dispute, and marketplace entities,
//!   their state machines, and the error taxonomy
//! - [`store`] - repository traits plus DashMap-backed in-memory
//!   implementations; every mutation validates and commits under the
//!   record's entry lock
//! - [`gateway`] - traits for the external collaborators
//! - [`crate::core`] - the [`SettlementEngine`] itself and the risk,
//!   escrow, dispute, and marketplace workflows layered onto it
//!
//! # Concurrency
//!
//! The engine is `Sync`; all operations take `&self` and may be called
//! from any number of threads. Consistency is per record: each mutation
//! re-validates the record's state under its lock and either commits
//! fully or leaves the record untouched. There are no background tasks;
//! escrow auto-release is evaluated lazily by
//! [`SettlementEngine::release_due_escrows`].

pub mod config;
pub mod core;
pub mod gateway;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use crate::core::{
    EngineStatistics, RiskContext, RiskScorer, SettlementEngine, StandardRiskScorer,
};
pub use types::{
    Actor, CustomerId, DisputeId, DisputePriority, DisputeReason, DisputeStatus, EngineError,
    ErrorKind, EvidenceKind, ItemFilter, ItemId, ItemListing, ItemStatus, P2PDispute,
    P2PMarketplaceItem, P2PTransaction, ResolutionDecision, TransactionId, TransactionRequest,
    TransactionStatus, TransactionType,
};
