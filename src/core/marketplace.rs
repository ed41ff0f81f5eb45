//! Marketplace settlement
//!
//! Listings are simple records until someone buys one. A purchase is
//! the marketplace's only coupling to the ledger: the item flips from
//! `active` to `sold` under its entry lock, then the engine creates the
//! escrowed sale transaction. The flip is the once-only gate; if the
//! transaction cannot be created the item is put back on sale.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::engine::SettlementEngine;
use crate::store::{DisputeRepository, ItemRepository, TransactionRepository};
use crate::types::{
    CustomerId, EngineError, ItemFilter, ItemId, ItemListing, ItemStatus, MarketplaceDetails,
    P2PMarketplaceItem, P2PTransaction, TransactionRequest, TransactionType,
};

impl<T, D, M> SettlementEngine<T, D, M>
where
    T: TransactionRepository,
    D: DisputeRepository,
    M: ItemRepository,
{
    /// List an item for sale
    ///
    /// The seller must be an active participant and the price positive.
    pub fn create_marketplace_item(
        &self,
        listing: ItemListing,
    ) -> Result<P2PMarketplaceItem, EngineError> {
        self.active_profile(listing.seller)?;
        if listing.price <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount {
                amount: listing.price,
            });
        }

        let item = P2PMarketplaceItem {
            id: self.next_item_id(),
            seller: listing.seller,
            title: listing.title,
            description: listing.description,
            category: listing.category,
            price: listing.price,
            currency: listing.currency,
            condition: listing.condition,
            images: listing.images,
            shipping: listing.shipping,
            status: ItemStatus::Active,
            buyer: None,
            sold_at: None,
            listed_at: Utc::now(),
        };
        self.items.insert(item.clone());
        info!(item = item.id, seller = item.seller, price = %item.price, "item listed");
        Ok(item)
    }

    /// Snapshot of a listing by id
    pub fn get_marketplace_item(&self, id: ItemId) -> Result<P2PMarketplaceItem, EngineError> {
        self.items
            .get(id)
            .ok_or(EngineError::ItemNotFound { item: id })
    }

    /// Listings matching the filter; an empty filter returns everything
    pub fn get_marketplace_items(&self, filter: &ItemFilter) -> Vec<P2PMarketplaceItem> {
        let mut items = self.items.query(filter);
        items.sort_by(|a, b| b.listed_at.cmp(&a.listed_at).then(b.id.cmp(&a.id)));
        items
    }

    /// Buy a listing, creating the escrowed sale transaction
    ///
    /// The item must be `active` and the buyer must not be the seller.
    /// The marketplace fee comes off the seller's proceeds. On any
    /// failure after the item flips to `sold`, the flip is reverted and
    /// the item goes back on sale.
    pub fn process_marketplace_purchase(
        &self,
        item_id: ItemId,
        buyer: CustomerId,
    ) -> Result<P2PTransaction, EngineError> {
        let now = Utc::now();

        let item = self.items.update(item_id, |item| {
            if item.seller == buyer {
                return Err(EngineError::SellerIsBuyer {
                    item: item.id,
                    customer: buyer,
                });
            }
            if item.status != ItemStatus::Active {
                return Err(EngineError::ItemNotPurchasable {
                    item: item.id,
                    status: item.status,
                });
            }
            item.status = ItemStatus::Sold;
            item.buyer = Some(buyer);
            item.sold_at = Some(now);
            Ok(())
        })?;

        let fee = self.config.marketplace_fee(item.price);
        let request = TransactionRequest {
            sender: buyer,
            receiver: item.seller,
            amount: item.price,
            fee,
            currency: item.currency.clone(),
            tx_type: TransactionType::MarketplaceSale,
            description: format!("Purchase of \"{}\"", item.title),
            marketplace: Some(MarketplaceDetails {
                item_id,
                shipping_required: !item.shipping.is_empty(),
            }),
            service: None,
            loan: None,
            external_reference: None,
        };

        match self.create_transaction(request) {
            Ok(transaction) => {
                info!(
                    item = item_id,
                    transaction = transaction.id,
                    buyer,
                    fee = %fee,
                    "marketplace purchase settled"
                );
                Ok(transaction)
            }
            Err(e) => {
                // Put the item back on sale; the purchase never happened.
                let reverted = self.items.update(item_id, |item| {
                    item.status = ItemStatus::Active;
                    item.buyer = None;
                    item.sold_at = None;
                    Ok(())
                });
                if let Err(revert_err) = reverted {
                    warn!(item = item_id, error = %revert_err, "failed to relist item");
                }
                warn!(item = item_id, buyer, error = %e, "purchase rejected");
                Err(e)
            }
        }
    }
}
