//! Error types for the P2P settlement engine
//!
//! Every failure the engine can surface falls into one of four
//! categories, and every variant carries enough context for the caller
//! to produce a user-facing message:
//!
//! - **Validation errors**: bad inputs at creation time (inactive
//!   participant, self-transfer, non-positive amount, insufficient
//!   balance, item not purchasable).
//! - **State errors**: an operation attempted from a status outside the
//!   legal transition set.
//! - **Authorization errors**: message or dispute actions attempted by a
//!   non-participant.
//! - **Not-found errors**: unknown transaction/dispute/item id.
//!
//! All failures are synchronous, none are retried internally, and none
//! leave partial mutations. There is no fatal category; every error is a
//! recoverable-by-caller condition.

use rust_decimal::Decimal;
use thiserror::Error;

use super::dispute::DisputeStatus;
use super::marketplace::ItemStatus;
use super::transaction::{CustomerId, DisputeId, ItemId, TransactionId, TransactionStatus};

/// Broad error category, for callers that map failures to transport or
/// UI concerns without matching every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Authorization,
    NotFound,
}

/// Main error type for the settlement engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    // --- Validation ---
    /// Customer id unknown to the participant directory
    #[error("Customer {customer} not found in the participant directory")]
    ParticipantNotFound { customer: CustomerId },

    /// Participant exists but the account is not active
    #[error("Account for customer {customer} is not active")]
    AccountInactive { customer: CustomerId },

    /// Sender and receiver must be two different customers
    #[error("Customer {customer} cannot transact with themselves")]
    SelfTransfer { customer: CustomerId },

    /// Amounts must be strictly positive
    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount { amount: Decimal },

    /// Fee must be non-negative and must not exceed the amount
    #[error("Invalid fee {fee} for amount {amount}")]
    InvalidFee { fee: Decimal, amount: Decimal },

    /// Sender's available balance does not cover the amount
    #[error(
        "Insufficient balance for customer {customer}: available {available}, requested {requested}"
    )]
    InsufficientBalance {
        customer: CustomerId,
        available: Decimal,
        requested: Decimal,
    },

    /// Listing is not in a purchasable state
    #[error("Item {item} cannot be purchased (status: {status})")]
    ItemNotPurchasable { item: ItemId, status: ItemStatus },

    /// A seller cannot buy their own listing
    #[error("Customer {customer} cannot buy their own item {item}")]
    SellerIsBuyer { item: ItemId, customer: CustomerId },

    /// A transaction carries at most one active dispute
    #[error("Transaction {transaction} already has an active dispute")]
    DisputeAlreadyOpen { transaction: TransactionId },

    /// Partial refunds require an explicit amount
    #[error("Dispute {dispute} resolution requires a refund amount")]
    RefundAmountRequired { dispute: DisputeId },

    /// Refund amount must be positive and within the disputed amount
    #[error("Invalid refund amount {amount} for dispute {dispute}")]
    InvalidRefundAmount { dispute: DisputeId, amount: Decimal },

    // --- State ---
    /// The requested edge does not exist in the transaction status graph
    #[error("Transaction {transaction} cannot move from {from} to {to}")]
    IllegalTransition {
        transaction: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Escrow operation on a transaction without escrow terms
    #[error("Transaction {transaction} carries no escrow terms")]
    EscrowNotAttached { transaction: TransactionId },

    /// Escrow release is legal only from `processing`
    #[error("Escrow on transaction {transaction} cannot be released from status {status}")]
    EscrowNotReleasable {
        transaction: TransactionId,
        status: TransactionStatus,
    },

    /// Dispute operation attempted from an incompatible dispute status
    #[error("Dispute {dispute} in status {status} does not permit {operation}")]
    DisputeNotActionable {
        dispute: DisputeId,
        status: DisputeStatus,
        operation: String,
    },

    // --- Authorization ---
    /// Only the two transaction parties may act on a transaction
    #[error("Customer {customer} is not a participant of transaction {transaction}")]
    NotParticipant {
        transaction: TransactionId,
        customer: CustomerId,
    },

    /// Only the initiator or respondent may act on a dispute
    #[error("Customer {customer} is not a party to dispute {dispute}")]
    NotDisputeParty {
        dispute: DisputeId,
        customer: CustomerId,
    },

    // --- Not found ---
    #[error("Transaction {transaction} not found")]
    TransactionNotFound { transaction: TransactionId },

    #[error("Dispute {dispute} not found")]
    DisputeNotFound { dispute: DisputeId },

    #[error("Item {item} not found")]
    ItemNotFound { item: ItemId },
}

impl EngineError {
    /// The taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            ParticipantNotFound { .. }
            | AccountInactive { .. }
            | SelfTransfer { .. }
            | InvalidAmount { .. }
            | InvalidFee { .. }
            | InsufficientBalance { .. }
            | ItemNotPurchasable { .. }
            | SellerIsBuyer { .. }
            | DisputeAlreadyOpen { .. }
            | RefundAmountRequired { .. }
            | InvalidRefundAmount { .. } => ErrorKind::Validation,
            IllegalTransition { .. }
            | EscrowNotAttached { .. }
            | EscrowNotReleasable { .. }
            | DisputeNotActionable { .. } => ErrorKind::State,
            NotParticipant { .. } | NotDisputeParty { .. } => ErrorKind::Authorization,
            TransactionNotFound { .. } | DisputeNotFound { .. } | ItemNotFound { .. } => {
                ErrorKind::NotFound
            }
        }
    }

    pub fn insufficient_balance(
        customer: CustomerId,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        EngineError::InsufficientBalance {
            customer,
            available,
            requested,
        }
    }

    pub fn illegal_transition(
        transaction: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Self {
        EngineError::IllegalTransition {
            transaction,
            from,
            to,
        }
    }

    pub fn dispute_not_actionable(
        dispute: DisputeId,
        status: DisputeStatus,
        operation: &str,
    ) -> Self {
        EngineError::DisputeNotActionable {
            dispute,
            status,
            operation: operation.to_string(),
        }
    }

    pub fn not_participant(transaction: TransactionId, customer: CustomerId) -> Self {
        EngineError::NotParticipant {
            transaction,
            customer,
        }
    }

    pub fn not_dispute_party(dispute: DisputeId, customer: CustomerId) -> Self {
        EngineError::NotDisputeParty { dispute, customer }
    }

    pub fn transaction_not_found(transaction: TransactionId) -> Self {
        EngineError::TransactionNotFound { transaction }
    }

    pub fn dispute_not_found(dispute: DisputeId) -> Self {
        EngineError::DisputeNotFound { dispute }
    }

    pub fn item_not_found(item: ItemId) -> Self {
        EngineError::ItemNotFound { item }
    }
}
