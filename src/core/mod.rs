//! Core engine logic: the settlement engine and the workflow modules
//! layered onto it (risk, escrow, disputes, marketplace)

pub mod dispute;
pub mod engine;
pub mod escrow;
pub mod marketplace;
pub mod risk;

pub use engine::{EngineStatistics, SettlementEngine};
pub use risk::{RiskContext, RiskScorer, StandardRiskScorer};
