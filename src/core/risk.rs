//! Risk assessment engine
//!
//! A pure scoring function invoked once per transaction at creation.
//! The rules live behind the [`RiskScorer`] trait so they can evolve or
//! be swapped (e.g. for testing) without touching transition logic.

use rust_decimal::Decimal;

use crate::types::{RiskAssessment, RiskFlag, TransactionType};

/// Inputs to a risk assessment, assembled by the ledger at creation
#[derive(Debug, Clone, PartialEq)]
pub struct RiskContext {
    /// Directory-reported sender risk score, if any
    pub sender_directory_score: Option<u32>,
    /// Directory-reported receiver risk score, if any
    pub receiver_directory_score: Option<u32>,
    pub sender_account_age_days: i64,
    pub receiver_account_age_days: i64,
    pub amount: Decimal,
    pub tx_type: TransactionType,
}

/// Pluggable scoring seam
///
/// Implementations must be deterministic and side-effect free: the same
/// context produces the same assessment on every call.
pub trait RiskScorer: Send + Sync {
    fn score(&self, context: &RiskContext) -> RiskAssessment;
}

/// The standard scoring tables
///
/// - party score = directory score (default 50), +15 for accounts
///   younger than 30 days (`new_sender` / `new_receiver`);
/// - transaction score = +20 for amounts over 5000 (`large_amount`),
///   +10 for escrow deals (`escrow_transaction`);
/// - overall = average of the three, capped at 100; flagged above 70.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardRiskScorer;

impl StandardRiskScorer {
    const DEFAULT_PARTY_SCORE: u32 = 50;
    const NEW_ACCOUNT_AGE_DAYS: i64 = 30;
    const NEW_ACCOUNT_PENALTY: u32 = 15;
    const LARGE_AMOUNT_PENALTY: u32 = 20;
    const ESCROW_PENALTY: u32 = 10;
    const FLAG_THRESHOLD: f64 = 70.0;
    const MAX_SCORE: f64 = 100.0;

    fn large_amount_threshold() -> Decimal {
        Decimal::from(5000)
    }
}

impl RiskScorer for StandardRiskScorer {
    fn score(&self, context: &RiskContext) -> RiskAssessment {
        let mut flags = Vec::new();

        let mut sender_score = context
            .sender_directory_score
            .unwrap_or(Self::DEFAULT_PARTY_SCORE);
        if context.sender_account_age_days < Self::NEW_ACCOUNT_AGE_DAYS {
            sender_score += Self::NEW_ACCOUNT_PENALTY;
            flags.push(RiskFlag::NewSender);
        }

        let mut receiver_score = context
            .receiver_directory_score
            .unwrap_or(Self::DEFAULT_PARTY_SCORE);
        if context.receiver_account_age_days < Self::NEW_ACCOUNT_AGE_DAYS {
            receiver_score += Self::NEW_ACCOUNT_PENALTY;
            flags.push(RiskFlag::NewReceiver);
        }

        let mut transaction_score = 0;
        if context.amount > Self::large_amount_threshold() {
            transaction_score += Self::LARGE_AMOUNT_PENALTY;
            flags.push(RiskFlag::LargeAmount);
        }
        if context.tx_type == TransactionType::EscrowDeal {
            transaction_score += Self::ESCROW_PENALTY;
            flags.push(RiskFlag::EscrowTransaction);
        }

        let overall_score = (f64::from(sender_score)
            + f64::from(receiver_score)
            + f64::from(transaction_score))
            / 3.0;
        let overall_score = overall_score.min(Self::MAX_SCORE);

        RiskAssessment {
            sender_score,
            receiver_score,
            transaction_score,
            overall_score,
            flagged: overall_score > Self::FLAG_THRESHOLD,
            flags,
        }
    }
}
