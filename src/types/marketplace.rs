//! Marketplace listing types for the P2P settlement engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::{CustomerId, ItemId};

/// Listing lifecycle status
///
/// `Sold` is entered exactly once, atomically with the creation of the
/// purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Sold,
    Inactive,
    Flagged,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Active => "active",
            ItemStatus::Sold => "sold",
            ItemStatus::Inactive => "inactive",
            ItemStatus::Flagged => "flagged",
        };
        f.write_str(s)
    }
}

/// Seller-declared condition of the listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// One way the seller offers to ship the item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub method: String,
    pub cost: Decimal,
}

/// Caller-supplied inputs for `create_marketplace_item`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemListing {
    pub seller: CustomerId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub currency: String,
    pub condition: ItemCondition,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub shipping: Vec<ShippingOption>,
}

/// A sellable marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PMarketplaceItem {
    pub id: ItemId,
    pub seller: CustomerId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub currency: String,
    pub condition: ItemCondition,
    pub images: Vec<String>,
    pub shipping: Vec<ShippingOption>,
    pub status: ItemStatus,
    /// Set together with `sold_at` when the item sells
    pub buyer: Option<CustomerId>,
    pub sold_at: Option<DateTime<Utc>>,
    pub listed_at: DateTime<Utc>,
}

impl P2PMarketplaceItem {
    pub fn matches(&self, filter: &ItemFilter) -> bool {
        if let Some(status) = filter.status {
            if self.status != status {
                return false;
            }
        }
        if let Some(seller) = filter.seller {
            if self.seller != seller {
                return false;
            }
        }
        if let Some(category) = &filter.category {
            if &self.category != category {
                return false;
            }
        }
        if let Some(max_price) = filter.max_price {
            if self.price > max_price {
                return false;
            }
        }
        true
    }
}

/// Filters for `get_marketplace_items`; empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub seller: Option<CustomerId>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
}
