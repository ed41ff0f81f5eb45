//! Engine configuration
//!
//! Tunables that were hard-coded in earlier iterations of this design —
//! most importantly the escrow auto-release window — live here and are
//! injected into the engine at construction time.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Configuration for the settlement engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days until an unmanaged escrow hold releases automatically
    pub auto_release_days: i64,
    /// Length of the post-completion dispute window, in days
    pub dispute_window_days: i64,
    /// Marketplace fee as a fraction of the item price
    pub marketplace_fee_rate: Decimal,
    /// Floor for the marketplace fee
    pub marketplace_min_fee: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            auto_release_days: 7,
            dispute_window_days: 7,
            marketplace_fee_rate: Decimal::new(5, 2),   // 0.05
            marketplace_min_fee: Decimal::new(299, 2),  // 2.99
        }
    }
}

impl EngineConfig {
    /// The escrow auto-release window as a duration
    pub fn auto_release_window(&self) -> Duration {
        Duration::days(self.auto_release_days)
    }

    /// Marketplace fee for a listing price: max(rate x price, minimum),
    /// clamped to the price so the net amount cannot go negative
    pub fn marketplace_fee(&self, price: Decimal) -> Decimal {
        (price * self.marketplace_fee_rate)
            .max(self.marketplace_min_fee)
            .min(price)
    }
}
