//! Transaction-related types for the P2P settlement engine
//!
//! This module defines the transaction entity, its status state machine,
//! per-type facets, and the append-only history records (messages, audit
//! trail, notifications) attached to every transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::dispute::DisputeReason;

/// Customer identifier, assigned by the external customer directory
pub type CustomerId = u64;

/// Transaction identifier, allocated sequentially by the engine
pub type TransactionId = u64;

/// Dispute identifier, allocated sequentially by the engine
pub type DisputeId = u64;

/// Marketplace item identifier, allocated sequentially by the engine
pub type ItemId = u64;

/// Transaction types supported by the settlement engine
///
/// Escrow deals and marketplace sales carry escrow terms; the other
/// types settle directly once the external rail confirms them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Immediate transfer between two customers
    DirectTransfer,
    /// Funds held under escrow terms until released
    EscrowDeal,
    /// Purchase of a marketplace listing (escrowed, manual release)
    MarketplaceSale,
    /// Payment for a service with an agreed delivery date
    ServicePayment,
    /// One installment of a peer loan
    LoanRepayment,
}

impl TransactionType {
    /// Whether transactions of this type carry escrow terms
    pub fn uses_escrow(self) -> bool {
        matches!(
            self,
            TransactionType::EscrowDeal | TransactionType::MarketplaceSale
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::DirectTransfer => "direct_transfer",
            TransactionType::EscrowDeal => "escrow_deal",
            TransactionType::MarketplaceSale => "marketplace_sale",
            TransactionType::ServicePayment => "service_payment",
            TransactionType::LoanRepayment => "loan_repayment",
        };
        f.write_str(s)
    }
}

/// Transaction lifecycle status
///
/// Only the edges encoded in [`TransactionStatus::can_transition_to`] are
/// legal; every mutating operation re-verifies the current status under
/// the record lock before writing the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created and validated, awaiting settlement
    Pending,
    /// Picked up by the external settlement rail (or escrow funding)
    Processing,
    /// Funds delivered; the dispute window runs from here
    Completed,
    /// Settlement failed; terminal
    Failed,
    /// Cancelled by a participant before settlement; terminal
    Cancelled,
    /// An active dispute is attached
    Disputed,
    /// Dispute resolved with a full or partial refund; terminal
    Refunded,
}

impl TransactionStatus {
    /// Whether the edge `self -> next` exists in the transition graph
    ///
    /// ```text
    /// Pending    -> Processing, Cancelled
    /// Processing -> Completed, Failed
    /// Completed  -> Disputed
    /// Disputed   -> Completed, Refunded
    /// ```
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Disputed)
                | (Disputed, Completed)
                | (Disputed, Refunded)
        )
    }

    /// Whether no further transitions are possible from this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Refunded | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Disputed => "disputed",
            TransactionStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// Who performed an action: a customer or the engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Customer(CustomerId),
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Customer(id) => write!(f, "customer {id}"),
            Actor::System => f.write_str("system"),
        }
    }
}

/// Escrow terms attached at creation to escrow-eligible transactions
///
/// Computed once by the escrow controller and never re-computed. The
/// auto-release deadline is advisory data evaluated lazily by
/// `release_due_escrows`; there is no live timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// Fixed per-type list of human-readable release conditions
    pub release_conditions: Vec<String>,
    /// Deadline after which unmanaged escrow releases automatically
    pub auto_release_at: DateTime<Utc>,
    /// True when an explicit participant confirmation is expected
    pub manual_release_required: bool,
    /// Length of the post-completion dispute window, in days
    pub dispute_window_days: i64,
}

/// Marketplace facet, present on marketplace-sale transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceDetails {
    pub item_id: ItemId,
    pub shipping_required: bool,
}

/// Service facet, present on service-payment transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub delivery_date: Option<DateTime<Utc>>,
    pub accepted: bool,
}

/// Loan facet, present on loan-repayment transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetails {
    /// 1-based index of this installment
    pub installment: u32,
    pub installment_count: u32,
}

/// Flags raised by the risk assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    NewSender,
    NewReceiver,
    LargeAmount,
    EscrowTransaction,
}

/// Risk assessment computed once at transaction creation
///
/// Immutable afterward; re-assessment is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub sender_score: u32,
    pub receiver_score: u32,
    pub transaction_score: u32,
    /// Average of the three scores, capped at 100
    pub overall_score: f64,
    /// True when the overall score exceeds the flagging threshold
    pub flagged: bool,
    pub flags: Vec<RiskFlag>,
}

/// Notification categories dispatched by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TransactionCreated,
    TransactionCancelled,
    PaymentReceived,
    DisputeOpened,
    DisputeResolved,
}

/// A participant- or system-authored message on a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMessage {
    pub sender: Actor,
    pub body: String,
    pub attachments: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

/// One entry in a transaction's append-only audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor: Actor,
    pub action: String,
    pub detail: String,
}

/// Record of a dispatched notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub recipient: CustomerId,
    pub kind: NotificationKind,
    pub sent_at: DateTime<Utc>,
}

/// State of the dispute linkage carried on a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeLinkState {
    Open,
    Resolved,
    Closed,
}

/// Summary of the (at most one) dispute attached to a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeSummary {
    pub dispute_id: DisputeId,
    pub state: DisputeLinkState,
    pub reason: DisputeReason,
    /// Set when the dispute resolved with a refund decision
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
}

/// Caller-supplied inputs for `create_transaction`
///
/// The fee is computed by the caller per type and context; the engine
/// validates it and derives the net amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: CustomerId,
    pub receiver: CustomerId,
    pub amount: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub tx_type: TransactionType,
    pub description: String,
    #[serde(default)]
    pub marketplace: Option<MarketplaceDetails>,
    #[serde(default)]
    pub service: Option<ServiceDetails>,
    #[serde(default)]
    pub loan: Option<LoanDetails>,
    /// Opaque correlation id for off-system payment rails
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// A peer-to-peer transaction: the unit of value movement between
/// exactly two parties
///
/// Permanent ledger record; never deleted. All history fields are
/// append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PTransaction {
    pub id: TransactionId,
    pub tx_type: TransactionType,
    pub sender: CustomerId,
    pub receiver: CustomerId,
    pub amount: Decimal,
    pub fee: Decimal,
    /// Always `amount - fee`; never independently set
    pub net_amount: Decimal,
    pub currency: String,
    pub description: String,
    pub status: TransactionStatus,
    pub escrow: Option<EscrowTerms>,
    pub marketplace: Option<MarketplaceDetails>,
    pub service: Option<ServiceDetails>,
    pub loan: Option<LoanDetails>,
    pub risk: RiskAssessment,
    pub dispute: Option<DisputeSummary>,
    pub messages: Vec<TransactionMessage>,
    pub audit_trail: Vec<AuditEntry>,
    pub notifications: Vec<NotificationRecord>,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl P2PTransaction {
    /// Whether the customer is one of the two parties
    pub fn involves(&self, customer: CustomerId) -> bool {
        self.sender == customer || self.receiver == customer
    }

    /// The other party, if the customer is a participant
    pub fn counterparty(&self, customer: CustomerId) -> Option<CustomerId> {
        if customer == self.sender {
            Some(self.receiver)
        } else if customer == self.receiver {
            Some(self.sender)
        } else {
            None
        }
    }

    /// Whether an unresolved dispute is attached
    pub fn has_active_dispute(&self) -> bool {
        matches!(
            self.dispute,
            Some(DisputeSummary {
                state: DisputeLinkState::Open,
                ..
            })
        )
    }

    pub(crate) fn record_audit(
        &mut self,
        actor: Actor,
        action: &str,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.audit_trail.push(AuditEntry {
            at,
            actor,
            action: action.to_string(),
            detail: detail.into(),
        });
    }
}
