use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::collection::CollectionId;
use crate::domain::delivery::PaymentStatus;
use crate::domain::error::EngineError;
use crate::domain::events::MarketplaceEvent;
use crate::domain::repository::{BankDirectory, CollectionRepository, SaleRepository};
use crate::domain::sale::{Sale, SaleId};
use crate::domain::{BankId, SellerId};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::retry::with_read_retry;

#[async_trait]
pub trait SaleService: Send + Sync {
    /// Convert the seller's validated collection into a payout record.
    /// Bank display fields are snapshotted; the collection becomes sold
    /// exactly once.
    async fn create_sale(
        &self,
        seller: SellerId,
        collection: CollectionId,
        bank: BankId,
    ) -> Result<Sale, EngineError>;

    /// Admin-driven payout advance. Only `processing → paid` is allowed.
    async fn update_sale_status(
        &self,
        sale: SaleId,
        status: PaymentStatus,
    ) -> Result<Sale, EngineError>;

    async fn my_sales(&self, seller: SellerId) -> Result<Vec<Sale>, EngineError>;

    /// Ownership-checked fetch of one sale.
    async fn sale(&self, seller: SellerId, id: SaleId) -> Result<Sale, EngineError>;
}

pub struct StandardSaleService {
    collections: Arc<dyn CollectionRepository>,
    sales: Arc<dyn SaleRepository>,
    banks: Arc<dyn BankDirectory>,
    events: EventBus,
}

impl StandardSaleService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        sales: Arc<dyn SaleRepository>,
        banks: Arc<dyn BankDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            collections,
            sales,
            banks,
            events,
        }
    }
}

#[async_trait]
impl SaleService for StandardSaleService {
    async fn create_sale(
        &self,
        seller: SellerId,
        collection: CollectionId,
        bank: BankId,
    ) -> Result<Sale, EngineError> {
        let mut collection = with_read_retry("collections.find_by_id", || {
            self.collections.find_by_id(collection)
        })
        .await?
        .ok_or_else(|| EngineError::not_found("no collection found"))?;

        if collection.seller != seller {
            return Err(EngineError::forbidden(
                "collection does not belong to the caller",
            ));
        }
        if !collection.state.is_validated() {
            return Err(EngineError::conflict(
                "collection must be validated by an agent first",
            ));
        }
        let bank = self
            .banks
            .find_for_owner(bank, seller)
            .await?
            .ok_or_else(|| EngineError::not_found("no bank details found"))?;

        // All preconditions hold; this rejects a second sale attempt.
        collection.mark_sold()?;

        let sale = Sale::from_collection(&collection, &bank);
        self.sales.save(&sale).await?;
        self.collections.save(&collection).await?;

        // Fire-and-forget side effects; failures are the subscribers'
        // concern, the sale stands.
        let now = Utc::now();
        self.events.publish(MarketplaceEvent::SaleCompleted {
            seller,
            sale_id: sale.id,
            collection_id: collection.id,
            total_price: sale.total_price,
            completed_at: now,
        });
        self.events.publish(MarketplaceEvent::ReferralRecheck {
            seller,
            triggered_at: now,
        });
        self.events.publish(MarketplaceEvent::ChatCleared {
            collection_id: collection.id,
            cleared_at: now,
        });

        Ok(sale)
    }

    async fn update_sale_status(
        &self,
        sale: SaleId,
        status: PaymentStatus,
    ) -> Result<Sale, EngineError> {
        let mut sale = with_read_retry("sales.find_by_id", || self.sales.find_by_id(sale))
            .await?
            .ok_or_else(|| EngineError::not_found("no sale found with that id"))?;

        sale.advance_status(status)?;
        self.sales.save(&sale).await?;

        self.events.publish(MarketplaceEvent::PaymentReceived {
            seller: sale.seller,
            sale_id: sale.id,
            amount: sale.total_price,
            received_at: Utc::now(),
        });
        Ok(sale)
    }

    async fn my_sales(&self, seller: SellerId) -> Result<Vec<Sale>, EngineError> {
        Ok(with_read_retry("sales.find_by_seller", || {
            self.sales.find_by_seller(seller)
        })
        .await?)
    }

    async fn sale(&self, seller: SellerId, id: SaleId) -> Result<Sale, EngineError> {
        let sale = with_read_retry("sales.find_by_id", || self.sales.find_by_id(id))
            .await?
            .ok_or_else(|| EngineError::not_found("no sale found with that id"))?;
        if sale.seller != seller {
            return Err(EngineError::forbidden("not authorized to view this sale"));
        }
        Ok(sale)
    }
}
