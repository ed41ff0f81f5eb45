//! Storage module
//!
//! - `traits` - repository abstractions the engine is generic over
//! - `memory` - DashMap-backed in-memory implementations

pub mod memory;
pub mod traits;

pub use memory::{InMemoryDisputes, InMemoryItems, InMemoryTransactions};
pub use traits::{DisputeRepository, ItemRepository, TransactionRepository};
