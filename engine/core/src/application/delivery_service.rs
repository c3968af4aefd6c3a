use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::fee_service::FeeService;
use crate::domain::collection::{Collection, CollectionId};
use crate::domain::delivery::{Delivery, DeliveryId, PaymentStatus, PickupStatus};
use crate::domain::error::EngineError;
use crate::domain::repository::{CollectionRepository, DeliveryRepository};
use crate::domain::{AgentId, BankId, MaterialId, SellerId};
use crate::infrastructure::retry::with_read_retry;

/// Per-item agent profit at the current fee, previewed before a delivery
/// batch is actually created. Not persisted; the figures become final only
/// at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitPreview {
    pub collection_id: CollectionId,
    pub seller: SellerId,
    pub lines: Vec<ProfitLine>,
    pub total_quantity: Decimal,
    pub total_profit: Decimal,
    pub fee_per_kg: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitLine {
    pub material: MaterialId,
    pub quantity: Decimal,
    pub profit: Decimal,
}

#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Batch the agent's validated, undelivered collections into one
    /// delivery. Ids that do not match the filter are silently dropped so
    /// a client may submit a superset; an empty result is `NotFound`.
    async fn create_delivery(
        &self,
        agent: AgentId,
        collections: Vec<CollectionId>,
        payout_bank: Option<BankId>,
    ) -> Result<Delivery, EngineError>;

    /// Admin-driven status update. Both enums transition freely; no
    /// ordering is enforced between pickup and payment.
    async fn update_delivery_status(
        &self,
        delivery: DeliveryId,
        pickup: Option<PickupStatus>,
        payment: Option<PaymentStatus>,
    ) -> Result<Delivery, EngineError>;

    async fn delivery_history(&self, agent: AgentId) -> Result<Vec<Delivery>, EngineError>;

    /// Validated collections awaiting delivery, with profit previewed at
    /// the fee in effect right now.
    async fn validation_history(&self, agent: AgentId) -> Result<Vec<ProfitPreview>, EngineError>;
}

pub struct StandardDeliveryService {
    collections: Arc<dyn CollectionRepository>,
    deliveries: Arc<dyn DeliveryRepository>,
    fees: Arc<dyn FeeService>,
}

impl StandardDeliveryService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        fees: Arc<dyn FeeService>,
    ) -> Self {
        Self {
            collections,
            deliveries,
            fees,
        }
    }

    fn preview(collection: &Collection, fee_per_kg: Decimal) -> ProfitPreview {
        let lines: Vec<ProfitLine> = collection
            .items()
            .iter()
            .map(|item| ProfitLine {
                material: item.material,
                quantity: item.quantity,
                profit: item.quantity * fee_per_kg,
            })
            .collect();
        let total_profit = lines.iter().map(|line| line.profit).sum();
        ProfitPreview {
            collection_id: collection.id,
            seller: collection.seller,
            total_quantity: collection.total_quantity,
            total_profit,
            fee_per_kg,
            lines,
        }
    }
}

#[async_trait]
impl DeliveryService for StandardDeliveryService {
    async fn create_delivery(
        &self,
        agent: AgentId,
        collections: Vec<CollectionId>,
        payout_bank: Option<BankId>,
    ) -> Result<Delivery, EngineError> {
        let candidates = with_read_retry("collections.find_by_ids", || {
            self.collections.find_by_ids(&collections)
        })
        .await?;

        // A repeated id in the request must not count twice.
        let mut seen = HashSet::new();
        let included: Vec<Collection> = candidates
            .into_iter()
            .filter(|c| {
                seen.insert(c.id)
                    && c.state.assigned_agent() == Some(agent)
                    && c.state.is_validated()
                    && !c.state.is_delivered()
            })
            .collect();
        if included.is_empty() {
            return Err(EngineError::not_found("no valid collections found"));
        }

        // One fee snapshot for the whole batch, regardless of how the
        // registry moves afterwards.
        let fee_per_kg = self.fees.current_fee().await?;
        let delivery = Delivery::from_collections(agent, &included, fee_per_kg, payout_bank);
        self.deliveries.save(&delivery).await?;

        // The delivery record is already in place; a failed mark leaves a
        // collection eligible for a retried cleanup, not a corrupt batch.
        for mut collection in included {
            if let Err(err) = collection.mark_delivered() {
                error!(
                    "collection {} refused delivered mark after batching into {}: {}",
                    collection.id, delivery.id, err
                );
                continue;
            }
            if let Err(err) = self.collections.save(&collection).await {
                error!(
                    "failed to mark collection {} delivered for delivery {}: {}",
                    collection.id, delivery.id, err
                );
            }
        }

        Ok(delivery)
    }

    async fn update_delivery_status(
        &self,
        delivery: DeliveryId,
        pickup: Option<PickupStatus>,
        payment: Option<PaymentStatus>,
    ) -> Result<Delivery, EngineError> {
        let mut delivery = with_read_retry("deliveries.find_by_id", || {
            self.deliveries.find_by_id(delivery)
        })
        .await?
        .ok_or_else(|| EngineError::not_found("no delivery found with that id"))?;

        if let Some(pickup) = pickup {
            delivery.pickup_status = pickup;
        }
        if let Some(payment) = payment {
            delivery.agent_payment_status = payment;
        }
        self.deliveries.save(&delivery).await?;
        Ok(delivery)
    }

    async fn delivery_history(&self, agent: AgentId) -> Result<Vec<Delivery>, EngineError> {
        Ok(with_read_retry("deliveries.find_by_agent", || {
            self.deliveries.find_by_agent(agent)
        })
        .await?)
    }

    async fn validation_history(&self, agent: AgentId) -> Result<Vec<ProfitPreview>, EngineError> {
        let validated = with_read_retry("collections.find_validated_undelivered", || {
            self.collections.find_validated_undelivered(agent)
        })
        .await?;
        let fee_per_kg = self.fees.current_fee().await?;
        Ok(validated
            .iter()
            .map(|collection| Self::preview(collection, fee_per_kg))
            .collect())
    }
}
