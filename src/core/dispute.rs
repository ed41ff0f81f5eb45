//! Dispute workflow
//!
//! A dispute is a separate record linked to exactly one completed
//! transaction. Opening one moves the transaction to `disputed`;
//! resolution either refunds the sender or returns the transaction to
//! `completed`. The dispute and transaction records are updated one at
//! a time, each under its own lock, with the transaction-side link
//! written first so a second open attempt fails at the gate.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::engine::SettlementEngine;
use crate::store::{DisputeRepository, ItemRepository, TransactionRepository};
use crate::types::{
    Actor, CustomerId, DisputeId, DisputeLinkState, DisputeMessage, DisputePriority,
    DisputeReason, DisputeStatus, DisputeSummary, EngineError, Evidence, EvidenceKind,
    NotificationKind, NotificationRecord, P2PDispute, Resolution, ResolutionDecision,
    TransactionId, TransactionStatus,
};

impl<T, D, M> SettlementEngine<T, D, M>
where
    T: TransactionRepository,
    D: DisputeRepository,
    M: ItemRepository,
{
    /// Open a dispute against a completed transaction
    ///
    /// The initiator must be a participant, the transaction must be in
    /// `completed`, and no other dispute may be attached. Priority is
    /// derived from the reason and the transaction amount. The
    /// description becomes the dispute's first message and the
    /// respondent is notified.
    pub fn create_dispute(
        &self,
        transaction_id: TransactionId,
        initiated_by: CustomerId,
        reason: DisputeReason,
        description: &str,
    ) -> Result<P2PDispute, EngineError> {
        let now = Utc::now();
        let dispute_id = self.next_dispute_id();

        // Flip the transaction first. Its entry lock is the gate that
        // makes a concurrent second open attempt fail.
        let transaction = self.transactions.update(transaction_id, |t| {
            if !t.involves(initiated_by) {
                return Err(EngineError::not_participant(t.id, initiated_by));
            }
            if t.has_active_dispute() {
                return Err(EngineError::DisputeAlreadyOpen { transaction: t.id });
            }
            if !t.status.can_transition_to(TransactionStatus::Disputed) {
                return Err(EngineError::illegal_transition(
                    t.id,
                    t.status,
                    TransactionStatus::Disputed,
                ));
            }
            t.status = TransactionStatus::Disputed;
            t.dispute = Some(DisputeSummary {
                dispute_id,
                state: DisputeLinkState::Open,
                reason,
                refund_amount: None,
                refund_reason: None,
            });
            t.record_audit(
                Actor::Customer(initiated_by),
                "dispute_opened",
                format!("dispute {dispute_id}: {reason}"),
                now,
            );
            Ok(())
        })?;

        let respondent = transaction
            .counterparty(initiated_by)
            .ok_or(EngineError::not_participant(transaction_id, initiated_by))?;

        let dispute = P2PDispute {
            id: dispute_id,
            transaction_id,
            initiated_by,
            respondent,
            reason,
            description: description.to_string(),
            priority: DisputePriority::derive(reason, transaction.amount),
            status: DisputeStatus::Open,
            evidence: Vec::new(),
            messages: vec![DisputeMessage {
                sender: Actor::Customer(initiated_by),
                body: description.to_string(),
                internal: false,
                sent_at: now,
            }],
            resolution: None,
            created_at: now,
        };
        self.disputes.insert(dispute.clone());

        self.notifier.send(
            respondent,
            NotificationKind::DisputeOpened,
            &format!("A dispute was opened against transaction {transaction_id}"),
        );
        info!(
            dispute = dispute_id,
            transaction = transaction_id,
            reason = %reason,
            priority = ?dispute.priority,
            "dispute opened"
        );
        Ok(dispute)
    }

    /// Operator picks the dispute up: `open` -> `under_review`
    pub fn begin_dispute_review(&self, id: DisputeId) -> Result<P2PDispute, EngineError> {
        self.dispute_transition(id, DisputeStatus::UnderReview, "begin_review")
    }

    /// Escalate a reviewed dispute: `under_review` -> `escalated`
    pub fn escalate_dispute(&self, id: DisputeId) -> Result<P2PDispute, EngineError> {
        self.dispute_transition(id, DisputeStatus::Escalated, "escalate")
    }

    /// Attach evidence to an open or under-review dispute
    ///
    /// Only the initiator or respondent may submit.
    pub fn add_dispute_evidence(
        &self,
        id: DisputeId,
        uploaded_by: CustomerId,
        kind: EvidenceKind,
        description: &str,
    ) -> Result<P2PDispute, EngineError> {
        let now = Utc::now();
        self.disputes.update(id, |d| {
            if !d.involves(uploaded_by) {
                return Err(EngineError::not_dispute_party(d.id, uploaded_by));
            }
            if !d.status.accepts_evidence() {
                return Err(EngineError::dispute_not_actionable(
                    d.id,
                    d.status,
                    "add_evidence",
                ));
            }
            d.evidence.push(Evidence {
                kind,
                description: description.to_string(),
                uploaded_by,
                uploaded_at: now,
            });
            Ok(())
        })
    }

    /// Append a message to the dispute thread
    ///
    /// Parties post external messages; `Actor::System` may post
    /// internal arbitration notes. Messages are accepted until the
    /// dispute reaches a terminal status.
    pub fn post_dispute_message(
        &self,
        id: DisputeId,
        sender: Actor,
        body: &str,
        internal: bool,
    ) -> Result<P2PDispute, EngineError> {
        let now = Utc::now();
        self.disputes.update(id, |d| {
            if let Actor::Customer(customer) = sender {
                if !d.involves(customer) {
                    return Err(EngineError::not_dispute_party(d.id, customer));
                }
            }
            if d.status.is_terminal() {
                return Err(EngineError::dispute_not_actionable(
                    d.id,
                    d.status,
                    "post_message",
                ));
            }
            d.messages.push(DisputeMessage {
                sender,
                body: body.to_string(),
                internal,
                sent_at: now,
            });
            Ok(())
        })
    }

    /// Resolve a dispute with a decision
    ///
    /// A full refund takes the transaction amount; a partial refund
    /// requires an explicit amount within `(0, amount]`. Refunding
    /// decisions move the transaction to `refunded`; every other
    /// decision returns it to `completed`. Both parties are notified.
    pub fn resolve_dispute(
        &self,
        id: DisputeId,
        decision: ResolutionDecision,
        refund_amount: Option<Decimal>,
        reasoning: &str,
        resolved_by: CustomerId,
    ) -> Result<P2PDispute, EngineError> {
        let now = Utc::now();
        let dispute = self.get_dispute(id)?;
        let transaction = self.get_transaction(dispute.transaction_id)?;

        let refund = match decision {
            ResolutionDecision::RefundFull => Some(transaction.amount),
            ResolutionDecision::RefundPartial => {
                let amount =
                    refund_amount.ok_or(EngineError::RefundAmountRequired { dispute: id })?;
                if amount <= Decimal::ZERO || amount > transaction.amount {
                    return Err(EngineError::InvalidRefundAmount {
                        dispute: id,
                        amount,
                    });
                }
                Some(amount)
            }
            ResolutionDecision::NoRefund
            | ResolutionDecision::Replacement
            | ResolutionDecision::ServiceRedelivery => None,
        };

        let resolved = self.disputes.update(id, |d| {
            if !d.status.can_transition_to(DisputeStatus::Resolved) {
                return Err(EngineError::dispute_not_actionable(d.id, d.status, "resolve"));
            }
            d.status = DisputeStatus::Resolved;
            d.resolution = Some(Resolution {
                decision,
                refund_amount: refund,
                reasoning: reasoning.to_string(),
                decided_by: resolved_by,
                decided_at: now,
            });
            Ok(())
        })?;

        let target = if decision.is_refund() {
            TransactionStatus::Refunded
        } else {
            TransactionStatus::Completed
        };
        self.transactions.update(resolved.transaction_id, |t| {
            if !t.status.can_transition_to(target) {
                return Err(EngineError::illegal_transition(t.id, t.status, target));
            }
            t.status = target;
            if let Some(summary) = t.dispute.as_mut() {
                summary.state = DisputeLinkState::Resolved;
                summary.refund_amount = refund;
                summary.refund_reason = refund.map(|_| reasoning.to_string());
            }
            t.record_audit(
                Actor::Customer(resolved_by),
                "dispute_resolved",
                format!("dispute {id} resolved: {decision:?}"),
                now,
            );
            t.notifications.push(NotificationRecord {
                recipient: t.sender,
                kind: NotificationKind::DisputeResolved,
                sent_at: now,
            });
            t.notifications.push(NotificationRecord {
                recipient: t.receiver,
                kind: NotificationKind::DisputeResolved,
                sent_at: now,
            });
            Ok(())
        })?;

        let message = format!("Dispute {id} was resolved");
        self.notifier
            .send(resolved.initiated_by, NotificationKind::DisputeResolved, &message);
        self.notifier
            .send(resolved.respondent, NotificationKind::DisputeResolved, &message);
        info!(
            dispute = id,
            transaction = resolved.transaction_id,
            decision = ?decision,
            refund = ?refund,
            "dispute resolved"
        );
        Ok(resolved)
    }

    /// Administratively close a dispute without a resolution
    ///
    /// Allowed from any non-terminal status. The transaction returns to
    /// `completed` and its link records the closure.
    pub fn close_dispute(&self, id: DisputeId, closed_by: Actor) -> Result<P2PDispute, EngineError> {
        let now = Utc::now();
        let closed = self.disputes.update(id, |d| {
            if !d.status.can_transition_to(DisputeStatus::Closed) {
                return Err(EngineError::dispute_not_actionable(d.id, d.status, "close"));
            }
            d.status = DisputeStatus::Closed;
            Ok(())
        })?;

        self.transactions.update(closed.transaction_id, |t| {
            if !t.status.can_transition_to(TransactionStatus::Completed) {
                return Err(EngineError::illegal_transition(
                    t.id,
                    t.status,
                    TransactionStatus::Completed,
                ));
            }
            t.status = TransactionStatus::Completed;
            if let Some(summary) = t.dispute.as_mut() {
                summary.state = DisputeLinkState::Closed;
            }
            t.record_audit(
                closed_by,
                "dispute_closed",
                format!("dispute {id} closed without resolution"),
                now,
            );
            Ok(())
        })?;

        info!(dispute = id, transaction = closed.transaction_id, "dispute closed");
        Ok(closed)
    }

    /// Snapshot of a dispute by id
    pub fn get_dispute(&self, id: DisputeId) -> Result<P2PDispute, EngineError> {
        self.disputes
            .get(id)
            .ok_or(EngineError::DisputeNotFound { dispute: id })
    }

    /// All disputes where the customer is initiator or respondent,
    /// newest first
    pub fn get_customer_disputes(&self, customer: CustomerId) -> Vec<P2PDispute> {
        let mut disputes = self.disputes.for_customer(customer);
        disputes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        disputes
    }

    fn dispute_transition(
        &self,
        id: DisputeId,
        to: DisputeStatus,
        operation: &'static str,
    ) -> Result<P2PDispute, EngineError> {
        let result = self.disputes.update(id, |d| {
            if !d.status.can_transition_to(to) {
                return Err(EngineError::dispute_not_actionable(d.id, d.status, operation));
            }
            d.status = to;
            Ok(())
        });
        match &result {
            Ok(updated) => info!(dispute = id, status = %updated.status, "dispute status changed"),
            Err(e) => warn!(dispute = id, error = %e, "dispute transition rejected"),
        }
        result
    }
}
