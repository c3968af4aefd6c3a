use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::collection::{Collection, CollectionId, LineItem, LineItemId};
use crate::domain::error::EngineError;
use crate::domain::events::MarketplaceEvent;
use crate::domain::repository::{AgentDirectory, CollectionRepository, MaterialPriceLookup};
use crate::domain::{AgentId, MaterialId, SellerId};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::retry::with_read_retry;

/// Agent-supplied final quantity for one material, re-priced at the
/// current catalog price when validation freezes the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalLineItem {
    pub material: MaterialId,
    pub quantity: Decimal,
}

/// Assignment and validation: the agent side of the pre-sale lifecycle.
///
/// Every operation checks `assigned agent == caller` before touching
/// state; precondition failures return without any mutation.
#[async_trait]
pub trait ValidationService: Send + Sync {
    /// Assign (or reassign) an agent. Only the collection's seller may
    /// pick the agent, and only while un-validated.
    async fn assign_agent(
        &self,
        collection: CollectionId,
        seller: SellerId,
        agent: AgentId,
    ) -> Result<Collection, EngineError>;

    /// Hand the order over to a different agent. Only the currently
    /// assigned agent may redirect, pre-validation, never to themselves.
    async fn redirect_order(
        &self,
        collection: CollectionId,
        current_agent: AgentId,
        new_agent: AgentId,
    ) -> Result<Collection, EngineError>;

    async fn update_item(
        &self,
        collection: CollectionId,
        agent: AgentId,
        item: LineItemId,
        new_quantity: Decimal,
    ) -> Result<Collection, EngineError>;

    /// Delete a line during validation. Deleting the sole remaining item
    /// is rejected; cancel the whole order instead.
    async fn delete_item(
        &self,
        collection: CollectionId,
        agent: AgentId,
        item: LineItemId,
    ) -> Result<Collection, EngineError>;

    /// Drop the collection entirely, notifying the seller.
    async fn cancel_order(
        &self,
        collection: CollectionId,
        agent: AgentId,
    ) -> Result<(), EngineError>;

    /// Freeze the collection. Optionally replaces the line items with the
    /// agent's final measurements first.
    async fn validate(
        &self,
        collection: CollectionId,
        agent: AgentId,
        final_items: Option<Vec<FinalLineItem>>,
    ) -> Result<Collection, EngineError>;

    async fn pending_validations(&self, agent: AgentId) -> Result<Vec<Collection>, EngineError>;
}

pub struct StandardValidationService {
    collections: Arc<dyn CollectionRepository>,
    materials: Arc<dyn MaterialPriceLookup>,
    agents: Arc<dyn AgentDirectory>,
    events: EventBus,
}

impl StandardValidationService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        materials: Arc<dyn MaterialPriceLookup>,
        agents: Arc<dyn AgentDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            collections,
            materials,
            agents,
            events,
        }
    }

    async fn find_collection(&self, id: CollectionId) -> Result<Collection, EngineError> {
        with_read_retry("collections.find_by_id", || self.collections.find_by_id(id))
            .await?
            .ok_or_else(|| EngineError::not_found("no collection found"))
    }

    /// Best-effort display name for notifications; falls back to the raw
    /// id rather than failing the primary operation.
    async fn agent_name(&self, agent: AgentId) -> String {
        match self.agents.display_name(agent).await {
            Ok(Some(name)) => name,
            Ok(None) => agent.to_string(),
            Err(err) => {
                warn!("agent name lookup failed for {}: {}", agent, err);
                agent.to_string()
            }
        }
    }

    fn check_assigned_agent(
        collection: &Collection,
        agent: AgentId,
    ) -> Result<(), EngineError> {
        if collection.state.assigned_agent() != Some(agent) {
            return Err(EngineError::forbidden(
                "caller is not the agent assigned to this collection",
            ));
        }
        Ok(())
    }

    fn check_not_validated(collection: &Collection) -> Result<(), EngineError> {
        if collection.state.is_validated() {
            return Err(EngineError::conflict("collection is already validated"));
        }
        Ok(())
    }

    /// Resolve agent-supplied final items against current catalog prices.
    /// Fully resolved before any mutation so a bad material or quantity
    /// leaves the collection untouched.
    async fn price_final_items(
        &self,
        final_items: Vec<FinalLineItem>,
    ) -> Result<Vec<LineItem>, EngineError> {
        if final_items.is_empty() {
            return Err(EngineError::validation(
                "final line items cannot be empty; cancel the order instead",
            ));
        }
        let mut priced = Vec::with_capacity(final_items.len());
        for final_item in final_items {
            if final_item.quantity < Decimal::ONE {
                return Err(EngineError::validation(
                    "final quantities must be at least 1",
                ));
            }
            let unit_price = self
                .materials
                .unit_price(final_item.material)
                .await?
                .ok_or_else(|| EngineError::not_found("no material found with that id"))?;
            priced.push(LineItem::new(
                final_item.material,
                final_item.quantity,
                unit_price,
            ));
        }
        Ok(priced)
    }
}

#[async_trait]
impl ValidationService for StandardValidationService {
    async fn assign_agent(
        &self,
        collection: CollectionId,
        seller: SellerId,
        agent: AgentId,
    ) -> Result<Collection, EngineError> {
        let mut collection = self.find_collection(collection).await?;
        if collection.seller != seller {
            return Err(EngineError::forbidden(
                "collection does not belong to the caller",
            ));
        }
        collection.assign(agent)?;
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn redirect_order(
        &self,
        collection: CollectionId,
        current_agent: AgentId,
        new_agent: AgentId,
    ) -> Result<Collection, EngineError> {
        if new_agent == current_agent {
            return Err(EngineError::validation("cannot redirect an order to self"));
        }
        let mut collection = self.find_collection(collection).await?;
        Self::check_assigned_agent(&collection, current_agent)?;
        Self::check_not_validated(&collection)?;

        collection.assign(new_agent)?;
        self.collections.save(&collection).await?;

        let from_agent_name = self.agent_name(current_agent).await;
        let to_agent_name = self.agent_name(new_agent).await;
        self.events.publish(MarketplaceEvent::AgentRedirect {
            seller: collection.seller,
            collection_id: collection.id,
            from_agent_name,
            to_agent_name,
            redirected_at: Utc::now(),
        });
        Ok(collection)
    }

    async fn update_item(
        &self,
        collection: CollectionId,
        agent: AgentId,
        item: LineItemId,
        new_quantity: Decimal,
    ) -> Result<Collection, EngineError> {
        if new_quantity < Decimal::ONE {
            return Err(EngineError::validation(
                "quantity must be at least 1; delete the item instead of zeroing it",
            ));
        }
        let mut collection = self.find_collection(collection).await?;
        Self::check_assigned_agent(&collection, agent)?;
        Self::check_not_validated(&collection)?;

        collection.set_item_quantity(item, new_quantity)?;
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn delete_item(
        &self,
        collection: CollectionId,
        agent: AgentId,
        item: LineItemId,
    ) -> Result<Collection, EngineError> {
        let mut collection = self.find_collection(collection).await?;
        Self::check_assigned_agent(&collection, agent)?;
        Self::check_not_validated(&collection)?;

        if collection.find_item(item).is_none() {
            return Err(EngineError::not_found("no such line item in collection"));
        }
        if collection.items().len() == 1 {
            return Err(EngineError::conflict(
                "cannot delete the last line item; cancel the order instead",
            ));
        }
        collection.delete_item(item)?;
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn cancel_order(
        &self,
        collection: CollectionId,
        agent: AgentId,
    ) -> Result<(), EngineError> {
        let collection = self.find_collection(collection).await?;
        Self::check_assigned_agent(&collection, agent)?;
        Self::check_not_validated(&collection)?;

        self.collections.delete(collection.id).await?;

        let agent_name = self.agent_name(agent).await;
        self.events.publish(MarketplaceEvent::OrderCancelled {
            seller: collection.seller,
            collection_id: collection.id,
            agent_name,
            cancelled_at: Utc::now(),
        });
        Ok(())
    }

    async fn validate(
        &self,
        collection: CollectionId,
        agent: AgentId,
        final_items: Option<Vec<FinalLineItem>>,
    ) -> Result<Collection, EngineError> {
        let mut collection = self.find_collection(collection).await?;
        Self::check_assigned_agent(&collection, agent)?;

        let replacement = match final_items {
            Some(items) => Some(self.price_final_items(items).await?),
            None => None,
        };

        collection.validate()?;
        if let Some(items) = replacement {
            collection.replace_items(items);
        }
        self.collections.save(&collection).await?;

        let agent_name = self.agent_name(agent).await;
        self.events.publish(MarketplaceEvent::AgentValidation {
            seller: collection.seller,
            collection_id: collection.id,
            agent_name,
            validated_at: Utc::now(),
        });
        Ok(collection)
    }

    async fn pending_validations(&self, agent: AgentId) -> Result<Vec<Collection>, EngineError> {
        Ok(with_read_retry("collections.find_pending_validation", || {
            self.collections.find_pending_validation(agent)
        })
        .await?)
    }
}
