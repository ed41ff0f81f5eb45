//! The transaction ledger
//!
//! `SettlementEngine` is the authoritative state machine and append-only
//! history for every P2P transaction. It validates creation requests
//! against the participant directory and balance authority, records a
//! risk assessment, attaches escrow terms to escrow-eligible types, and
//! guards every status change against the transition graph.
//!
//! The engine is generic over its repositories (defaulting to the
//! in-memory ones) so a persistent store can be substituted without
//! touching this logic. External collaborators are trait objects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::escrow;
use crate::core::risk::{RiskContext, RiskScorer, StandardRiskScorer};
use crate::gateway::{
    AccountStatus, BalanceAuthority, CustomerProfile, NotificationDispatcher, ParticipantGateway,
};
use crate::store::{
    DisputeRepository, InMemoryDisputes, InMemoryItems, InMemoryTransactions, ItemRepository,
    TransactionRepository,
};
use crate::types::{
    Actor, CustomerId, DisputeId, DisputeStatus, EngineError, ItemId, NotificationKind,
    NotificationRecord, P2PTransaction, TransactionId, TransactionMessage, TransactionRequest,
    TransactionStatus,
};

/// Read-only summary of ledger activity
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatistics {
    pub total_transactions: usize,
    pub status_counts: HashMap<TransactionStatus, usize>,
    /// Sum of all transaction amounts ever created
    pub total_volume: Decimal,
    pub total_disputes: usize,
    pub resolved_disputes: usize,
    /// Resolved disputes over all disputes; 0 when none exist
    pub dispute_resolution_rate: f64,
}

/// The P2P settlement engine
///
/// Owns the transaction, dispute, and marketplace-item records through
/// its repositories; consults the external directory, balance
/// authority, and notification dispatcher; and performs every mutation
/// as a fully-validated unit of work under the record's lock.
pub struct SettlementEngine<T = InMemoryTransactions, D = InMemoryDisputes, M = InMemoryItems> {
    pub(crate) transactions: T,
    pub(crate) disputes: D,
    pub(crate) items: M,
    pub(crate) directory: Arc<dyn ParticipantGateway>,
    pub(crate) balances: Arc<dyn BalanceAuthority>,
    pub(crate) notifier: Arc<dyn NotificationDispatcher>,
    pub(crate) scorer: Arc<dyn RiskScorer>,
    pub(crate) config: EngineConfig,
    transaction_seq: AtomicU64,
    dispute_seq: AtomicU64,
    item_seq: AtomicU64,
}

impl SettlementEngine {
    /// Create an engine backed by the in-memory repositories and the
    /// standard risk scorer
    pub fn new(
        directory: Arc<dyn ParticipantGateway>,
        balances: Arc<dyn BalanceAuthority>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: EngineConfig,
    ) -> Self {
        Self::with_stores(
            InMemoryTransactions::new(),
            InMemoryDisputes::new(),
            InMemoryItems::new(),
            directory,
            balances,
            notifier,
            Arc::new(StandardRiskScorer),
            config,
        )
    }
}

impl<T, D, M> SettlementEngine<T, D, M>
where
    T: TransactionRepository,
    D: DisputeRepository,
    M: ItemRepository,
{
    /// Create an engine over caller-provided repositories and scorer
    #[allow(clippy::too_many_arguments)]
    pub fn with_stores(
        transactions: T,
        disputes: D,
        items: M,
        directory: Arc<dyn ParticipantGateway>,
        balances: Arc<dyn BalanceAuthority>,
        notifier: Arc<dyn NotificationDispatcher>,
        scorer: Arc<dyn RiskScorer>,
        config: EngineConfig,
    ) -> Self {
        SettlementEngine {
            transactions,
            disputes,
            items,
            directory,
            balances,
            notifier,
            scorer,
            config,
            transaction_seq: AtomicU64::new(0),
            dispute_seq: AtomicU64::new(0),
            item_seq: AtomicU64::new(0),
        }
    }

    /// Create a transaction in `pending` status
    ///
    /// Validates fully before writing anything: sender and receiver
    /// must differ and both be active, the amount must be positive, the
    /// fee in range, and the sender's available balance must cover the
    /// amount. On success the transaction carries its risk assessment,
    /// escrow terms when the type is escrow-eligible, a
    /// `transaction_created` audit entry, and a creation notification
    /// to both parties.
    pub fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<P2PTransaction, EngineError> {
        let now = Utc::now();

        if request.sender == request.receiver {
            return Err(EngineError::SelfTransfer {
                customer: request.sender,
            });
        }
        if request.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount {
                amount: request.amount,
            });
        }
        if request.fee < Decimal::ZERO || request.fee > request.amount {
            return Err(EngineError::InvalidFee {
                fee: request.fee,
                amount: request.amount,
            });
        }

        let sender_profile = self.active_profile(request.sender)?;
        let receiver_profile = self.active_profile(request.receiver)?;

        let available = self.balances.available_balance(request.sender);
        if available < request.amount {
            return Err(EngineError::insufficient_balance(
                request.sender,
                available,
                request.amount,
            ));
        }

        let risk = self.scorer.score(&RiskContext {
            sender_directory_score: sender_profile.risk_score,
            receiver_directory_score: receiver_profile.risk_score,
            sender_account_age_days: (now - sender_profile.registered_at).num_days(),
            receiver_account_age_days: (now - receiver_profile.registered_at).num_days(),
            amount: request.amount,
            tx_type: request.tx_type,
        });

        let escrow = request
            .tx_type
            .uses_escrow()
            .then(|| escrow::build_escrow_terms(request.tx_type, now, &self.config));

        let id = self.next_transaction_id();
        let mut transaction = P2PTransaction {
            id,
            tx_type: request.tx_type,
            sender: request.sender,
            receiver: request.receiver,
            amount: request.amount,
            fee: request.fee,
            net_amount: request.amount - request.fee,
            currency: request.currency,
            description: request.description,
            status: TransactionStatus::Pending,
            escrow,
            marketplace: request.marketplace,
            service: request.service,
            loan: request.loan,
            risk,
            dispute: None,
            messages: Vec::new(),
            audit_trail: Vec::new(),
            notifications: Vec::new(),
            external_reference: request.external_reference,
            created_at: now,
            completed_at: None,
        };

        transaction.record_audit(
            Actor::Customer(transaction.sender),
            "transaction_created",
            format!(
                "{} of {} {} to customer {}",
                transaction.tx_type, transaction.amount, transaction.currency, transaction.receiver
            ),
            now,
        );

        let message = format!("Transaction {id} created");
        for recipient in [transaction.sender, transaction.receiver] {
            self.notifier
                .send(recipient, NotificationKind::TransactionCreated, &message);
            transaction.notifications.push(NotificationRecord {
                recipient,
                kind: NotificationKind::TransactionCreated,
                sent_at: now,
            });
        }

        self.transactions.insert(transaction.clone());
        info!(
            transaction = id,
            tx_type = %transaction.tx_type,
            amount = %transaction.amount,
            flagged = transaction.risk.flagged,
            "transaction created"
        );
        Ok(transaction)
    }

    /// External settlement hook: `pending` -> `processing`
    pub fn begin_processing(&self, id: TransactionId) -> Result<P2PTransaction, EngineError> {
        self.transition(
            id,
            TransactionStatus::Processing,
            Actor::System,
            "processing_started",
            "picked up by settlement",
        )
    }

    /// External settlement hook: `processing` -> `completed`
    pub fn complete_transaction(&self, id: TransactionId) -> Result<P2PTransaction, EngineError> {
        self.transition(
            id,
            TransactionStatus::Completed,
            Actor::System,
            "transaction_completed",
            "settlement confirmed",
        )
    }

    /// External settlement hook: `processing` -> `failed`
    pub fn fail_transaction(
        &self,
        id: TransactionId,
        reason: &str,
    ) -> Result<P2PTransaction, EngineError> {
        self.transition(
            id,
            TransactionStatus::Failed,
            Actor::System,
            "transaction_failed",
            reason,
        )
    }

    /// Participant cancellation: `pending` -> `cancelled`
    pub fn cancel_transaction(
        &self,
        id: TransactionId,
        cancelled_by: CustomerId,
    ) -> Result<P2PTransaction, EngineError> {
        let now = Utc::now();
        let updated = self.transactions.update(id, |t| {
            if !t.involves(cancelled_by) {
                return Err(EngineError::not_participant(t.id, cancelled_by));
            }
            if !t.status.can_transition_to(TransactionStatus::Cancelled) {
                return Err(EngineError::illegal_transition(
                    t.id,
                    t.status,
                    TransactionStatus::Cancelled,
                ));
            }
            t.status = TransactionStatus::Cancelled;
            t.record_audit(
                Actor::Customer(cancelled_by),
                "transaction_cancelled",
                "cancelled by participant",
                now,
            );
            if let Some(other) = t.counterparty(cancelled_by) {
                t.notifications.push(NotificationRecord {
                    recipient: other,
                    kind: NotificationKind::TransactionCancelled,
                    sent_at: now,
                });
            }
            Ok(())
        })?;

        if let Some(other) = updated.counterparty(cancelled_by) {
            self.notifier.send(
                other,
                NotificationKind::TransactionCancelled,
                &format!("Transaction {id} was cancelled"),
            );
        }
        info!(transaction = id, by = cancelled_by, "transaction cancelled");
        Ok(updated)
    }

    /// Append a message to the transaction's log
    ///
    /// Only the two participants may post.
    pub fn send_transaction_message(
        &self,
        id: TransactionId,
        sender: CustomerId,
        body: &str,
        attachments: Vec<String>,
    ) -> Result<P2PTransaction, EngineError> {
        let now = Utc::now();
        let updated = self.transactions.update(id, |t| {
            if !t.involves(sender) {
                return Err(EngineError::not_participant(t.id, sender));
            }
            t.messages.push(TransactionMessage {
                sender: Actor::Customer(sender),
                body: body.to_string(),
                attachments: attachments.clone(),
                sent_at: now,
            });
            Ok(())
        })?;
        debug!(transaction = id, sender, "message appended");
        Ok(updated)
    }

    /// Snapshot of a transaction by id
    pub fn get_transaction(&self, id: TransactionId) -> Result<P2PTransaction, EngineError> {
        self.transactions
            .get(id)
            .ok_or(EngineError::TransactionNotFound { transaction: id })
    }

    /// All transactions where the customer is either party, newest first
    pub fn get_customer_transactions(&self, customer: CustomerId) -> Vec<P2PTransaction> {
        let mut transactions = self.transactions.for_customer(customer);
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        transactions
    }

    /// Counts by status, total volume, and the dispute resolution rate
    pub fn statistics(&self) -> EngineStatistics {
        let transactions = self.transactions.all();
        let mut status_counts: HashMap<TransactionStatus, usize> = HashMap::new();
        let mut total_volume = Decimal::ZERO;
        for transaction in &transactions {
            *status_counts.entry(transaction.status).or_default() += 1;
            total_volume += transaction.amount;
        }

        let disputes = self.disputes.all();
        let resolved = disputes
            .iter()
            .filter(|d| d.status == DisputeStatus::Resolved)
            .count();
        let rate = if disputes.is_empty() {
            0.0
        } else {
            resolved as f64 / disputes.len() as f64
        };

        EngineStatistics {
            total_transactions: transactions.len(),
            status_counts,
            total_volume,
            total_disputes: disputes.len(),
            resolved_disputes: resolved,
            dispute_resolution_rate: rate,
        }
    }

    /// Guarded edge of the transaction status graph
    ///
    /// Verifies the edge under the record lock, stamps `completed_at` on
    /// completion, and appends the audit entry.
    pub(crate) fn transition(
        &self,
        id: TransactionId,
        to: TransactionStatus,
        actor: Actor,
        action: &str,
        detail: impl Into<String>,
    ) -> Result<P2PTransaction, EngineError> {
        let now = Utc::now();
        let detail = detail.into();
        let result = self.transactions.update(id, |t| {
            if !t.status.can_transition_to(to) {
                return Err(EngineError::illegal_transition(t.id, t.status, to));
            }
            t.status = to;
            if to == TransactionStatus::Completed && t.completed_at.is_none() {
                t.completed_at = Some(now);
            }
            t.record_audit(actor, action, detail, now);
            Ok(())
        });

        match &result {
            Ok(updated) => info!(transaction = id, status = %updated.status, "status changed"),
            Err(e) => warn!(transaction = id, error = %e, "transition rejected"),
        }
        result
    }

    pub(crate) fn active_profile(
        &self,
        customer: CustomerId,
    ) -> Result<CustomerProfile, EngineError> {
        let profile = self
            .directory
            .profile(customer)
            .ok_or(EngineError::ParticipantNotFound { customer })?;
        if profile.account_status != AccountStatus::Active {
            return Err(EngineError::AccountInactive { customer });
        }
        Ok(profile)
    }

    pub(crate) fn next_transaction_id(&self) -> TransactionId {
        self.transaction_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn next_dispute_id(&self) -> DisputeId {
        self.dispute_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn next_item_id(&self) -> ItemId {
        self.item_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}
