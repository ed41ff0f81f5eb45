//! Dispute-related types for the P2P settlement engine
//!
//! A dispute is a claim against a completed transaction, raised by one of
//! its two participants. It runs its own state machine, accumulates
//! evidence and messages, and on resolution writes its outcome back onto
//! the transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::{Actor, CustomerId, DisputeId, TransactionId};

/// Dispute lifecycle status
///
/// `Closed` is reachable from any non-resolved state as an administrative
/// short-circuit; `Resolved` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Escalated,
    Resolved,
    Closed,
}

impl DisputeStatus {
    /// Whether the edge `self -> next` exists in the dispute state machine
    ///
    /// ```text
    /// Open        -> UnderReview, Resolved, Closed
    /// UnderReview -> Escalated, Resolved, Closed
    /// Escalated   -> Resolved, Closed
    /// ```
    pub fn can_transition_to(self, next: DisputeStatus) -> bool {
        use DisputeStatus::*;
        matches!(
            (self, next),
            (Open, UnderReview)
                | (Open, Resolved)
                | (Open, Closed)
                | (UnderReview, Escalated)
                | (UnderReview, Resolved)
                | (UnderReview, Closed)
                | (Escalated, Resolved)
                | (Escalated, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Closed)
    }

    /// Evidence may be added only while the claim is still being built
    pub fn accepts_evidence(self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::UnderReview)
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisputeStatus::Open => "open",
            DisputeStatus::UnderReview => "under_review",
            DisputeStatus::Escalated => "escalated",
            DisputeStatus::Resolved => "resolved",
            DisputeStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The claimed grounds for a dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    ItemNotReceived,
    ItemNotAsDescribed,
    ServiceNotDelivered,
    PaymentNotReceived,
    UnauthorizedCharge,
    Other,
}

impl fmt::Display for DisputeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisputeReason::ItemNotReceived => "item_not_received",
            DisputeReason::ItemNotAsDescribed => "item_not_as_described",
            DisputeReason::ServiceNotDelivered => "service_not_delivered",
            DisputeReason::PaymentNotReceived => "payment_not_received",
            DisputeReason::UnauthorizedCharge => "unauthorized_charge",
            DisputeReason::Other => "other",
        };
        f.write_str(s)
    }
}

/// Handling priority, derived from reason and disputed amount at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl DisputePriority {
    /// Derive the priority for a new dispute
    ///
    /// Urgent for a missing payment over 1000; otherwise tiered purely by
    /// the disputed amount.
    pub fn derive(reason: DisputeReason, amount: Decimal) -> Self {
        if reason == DisputeReason::PaymentNotReceived && amount > Decimal::from(1000) {
            DisputePriority::Urgent
        } else if amount > Decimal::from(500) {
            DisputePriority::High
        } else if amount > Decimal::from(100) {
            DisputePriority::Medium
        } else {
            DisputePriority::Low
        }
    }
}

/// Kinds of evidence a party may attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Text,
    Image,
    Document,
    Video,
}

/// One piece of evidence attached to a dispute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub description: String,
    pub uploaded_by: CustomerId,
    pub uploaded_at: DateTime<Utc>,
}

/// The arbitration outcome of a resolved dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionDecision {
    RefundFull,
    RefundPartial,
    NoRefund,
    Replacement,
    ServiceRedelivery,
}

impl ResolutionDecision {
    /// Whether this decision moves funds back to the initiator
    pub fn is_refund(self) -> bool {
        matches!(
            self,
            ResolutionDecision::RefundFull | ResolutionDecision::RefundPartial
        )
    }
}

/// Resolution details, set exactly once on the transition to `Resolved`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: ResolutionDecision,
    pub refund_amount: Option<Decimal>,
    pub reasoning: String,
    pub decided_by: CustomerId,
    pub decided_at: DateTime<Utc>,
}

/// A message on a dispute, optionally visible only to arbitration staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeMessage {
    pub sender: Actor,
    pub body: String,
    /// Internal messages are hidden from the participants
    pub internal: bool,
    pub sent_at: DateTime<Utc>,
}

/// A claim against a completed transaction
///
/// Created only by one of the transaction's two participants, 1:1 with
/// the active dispute on that transaction. Resolution fields are
/// immutable once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PDispute {
    pub id: DisputeId,
    pub transaction_id: TransactionId,
    pub initiated_by: CustomerId,
    pub respondent: CustomerId,
    pub reason: DisputeReason,
    pub description: String,
    pub priority: DisputePriority,
    pub status: DisputeStatus,
    pub evidence: Vec<Evidence>,
    pub messages: Vec<DisputeMessage>,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
}

impl P2PDispute {
    /// Whether the customer is the initiator or the respondent
    pub fn involves(&self, customer: CustomerId) -> bool {
        self.initiated_by == customer || self.respondent == customer
    }
}
