// Giveaway Bot - Trading integration
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::TradingError;
use crate::throttle::{Clock, FireGuard};
use crate::utils;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Common,
    Uncommon,
    Rare,
    Premium,
    Mythical,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 5] = [
        ItemCategory::Common,
        ItemCategory::Uncommon,
        ItemCategory::Rare,
        ItemCategory::Premium,
        ItemCategory::Mythical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ItemCategory::Common => "Common",
            ItemCategory::Uncommon => "Uncommon",
            ItemCategory::Rare => "Rare",
            ItemCategory::Premium => "Premium",
            ItemCategory::Mythical => "Mythical",
        }
    }
}

/// One tradable item in the bot's inventory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    pub asset_id: String,
    pub name: String,
    /// Type line as reported by the trading service, e.g. "Rare Shirt"
    pub type_label: String,
}

impl InventoryItem {
    pub fn category(&self) -> Option<ItemCategory> {
        ItemCategory::ALL
            .into_iter()
            .find(|category| self.type_label.contains(category.label()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferStatus {
    Sent,
    /// Sent but waiting on a mobile confirmation
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferReceipt {
    pub offer_id: String,
    pub status: OfferStatus,
}

/// A trade offer someone else sent the bot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingOffer {
    pub offer_id: String,
    /// Items the sender wants from the bot
    pub items_to_give: usize,
    pub items_to_receive: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    Decline,
}

/// Opaque prize-delivery service with its own confirmation protocol
#[async_trait]
pub trait TradingService: Send + Sync {
    async fn inventory(&self) -> Result<Vec<InventoryItem>, TradingError>;

    async fn create_offer(
        &self,
        destination: &str,
        items: Vec<InventoryItem>,
        message: &str,
    ) -> Result<OfferReceipt, TradingError>;

    async fn confirm_offer(&self, offer_id: &str) -> Result<(), TradingError>;

    async fn respond_to_offer(&self, offer_id: &str, decision: OfferDecision) -> Result<(), TradingError>;

    async fn is_logged_in(&self) -> Result<bool, TradingError>;

    async fn relog(&self) -> Result<(), TradingError>;
}

/// Donations (offers asking for nothing of ours) are accepted, the rest declined
pub fn review_incoming(offer: &IncomingOffer) -> OfferDecision {
    if offer.items_to_give == 0 {
        OfferDecision::Accept
    } else {
        OfferDecision::Decline
    }
}

pub fn category_counts(items: &[InventoryItem]) -> Vec<(ItemCategory, usize)> {
    ItemCategory::ALL
        .into_iter()
        .map(|category| {
            let count = items
                .iter()
                .filter(|item| item.category() == Some(category))
                .count();
            (category, count)
        })
        .collect()
}

/// Send a random handful of inventory items to `destination`, confirming the
/// offer when the service parks it as pending.
pub async fn deliver_prize(
    trading: &dyn TradingService,
    destination: &str,
    item_range: (usize, usize),
    message: &str,
) -> Result<OfferReceipt, TradingError> {
    let inventory = trading.inventory().await?;
    if inventory.is_empty() {
        return Err(TradingError::EmptyInventory);
    }
    info!("Found {} items", inventory.len());

    let items = utils::sample_prize(&inventory, item_range.0, item_range.1);
    let receipt = trading.create_offer(destination, items, message).await?;
    match receipt.status {
        OfferStatus::Pending => {
            info!("Offer #{} sent, but requires confirmation", receipt.offer_id);
            trading.confirm_offer(&receipt.offer_id).await?;
            info!("Offer #{} confirmed", receipt.offer_id);
        }
        OfferStatus::Sent => info!("Offer #{} sent successfully", receipt.offer_id),
    }
    Ok(receipt)
}

/// Owns reconnects of the process-wide trading session
pub struct SessionKeeper {
    trading: Arc<dyn TradingService>,
    clock: Arc<dyn Clock>,
    guard: FireGuard,
}

impl SessionKeeper {
    pub fn new(trading: Arc<dyn TradingService>, clock: Arc<dyn Clock>, guard_window: chrono::Duration) -> Self {
        Self {
            trading,
            clock,
            guard: FireGuard::new(guard_window),
        }
    }

    /// Reconnect unless another reconnect happened moments ago. Returns
    /// whether a reconnect was attempted.
    pub async fn reconnect(&self, reason: &str) -> bool {
        if !self.guard.try_fire(self.clock.now()) {
            warn!("Reconnect ({}) requested too fast, skipping", reason);
            return false;
        }
        info!("Relogging trading session: {}", reason);
        if let Err(e) = self.trading.relog().await {
            warn!("Relog failed: {}", e);
        }
        true
    }

    /// Reconnect only if the session reports it is logged out
    pub async fn health_check(&self) -> bool {
        match self.trading.is_logged_in().await {
            Ok(true) => {
                info!("Trading session is logged in, all is good");
                false
            }
            Ok(false) => self.reconnect("health check found session logged out").await,
            Err(e) => {
                warn!("Trading session check failed: {}", e);
                self.reconnect("session health check failed").await
            }
        }
    }
}
