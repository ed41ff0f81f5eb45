//! Types module
//!
//! Core data structures used throughout the engine, organized into
//! logical submodules:
//! - `transaction`: the transaction entity, status graph, and facets
//! - `dispute`: disputes, evidence, and resolutions
//! - `marketplace`: listings and listing filters
//! - `error`: the engine error taxonomy

pub mod dispute;
pub mod error;
pub mod marketplace;
pub mod transaction;

pub use dispute::{
    DisputeMessage, DisputePriority, DisputeReason, DisputeStatus, Evidence, EvidenceKind,
    P2PDispute, Resolution, ResolutionDecision,
};
pub use error::{EngineError, ErrorKind};
pub use marketplace::{
    ItemCondition, ItemFilter, ItemListing, ItemStatus, P2PMarketplaceItem, ShippingOption,
};
pub use transaction::{
    Actor, AuditEntry, CustomerId, DisputeId, DisputeLinkState, DisputeSummary, EscrowTerms,
    ItemId, LoanDetails, MarketplaceDetails, NotificationKind, NotificationRecord, P2PTransaction,
    RiskAssessment, RiskFlag, ServiceDetails, TransactionId, TransactionMessage,
    TransactionRequest, TransactionStatus, TransactionType,
};
