// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Collection aggregate and its lifecycle state machine.
//!
//! A collection ("bin") is one seller's in-progress batch of recyclable
//! line items. All transitions go through [`CollectionState::apply`], the
//! single authoritative transition function; invalid flag combinations
//! (e.g. sold but never validated) are unrepresentable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::EngineError;
use crate::domain::{AgentId, MaterialId, SellerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub Uuid);

impl CollectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub Uuid);

impl LineItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// One material entry in a collection. The unit price is a snapshot taken
/// from the material catalog at the time the line was (re)priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub material: MaterialId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub price: Decimal,
}

impl LineItem {
    pub fn new(material: MaterialId, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            id: LineItemId::new(),
            material,
            quantity,
            unit_price,
            price: quantity * unit_price,
        }
    }

    fn reprice(&mut self) {
        self.price = self.quantity * self.unit_price;
    }
}

/// Lifecycle state. The agent reference travels with the state from
/// assignment onwards; `Sold` keeps a delivered flag because a sold but
/// undelivered collection still joins an agent's delivery batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionState {
    Open,
    Assigned { agent: AgentId },
    Validated { agent: AgentId },
    Delivered { agent: AgentId },
    Sold { agent: AgentId, delivered: bool },
}

/// Requested state change, fed to [`CollectionState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Assign(AgentId),
    Validate,
    Deliver,
    Sell,
}

impl CollectionState {
    /// The single transition function. Returns the successor state or a
    /// `Conflict` for any skipped or reversed transition.
    pub fn apply(self, transition: Transition) -> Result<CollectionState, EngineError> {
        match (self, transition) {
            (CollectionState::Open, Transition::Assign(agent))
            | (CollectionState::Assigned { .. }, Transition::Assign(agent)) => {
                Ok(CollectionState::Assigned { agent })
            }
            (_, Transition::Assign(_)) => Err(EngineError::conflict(
                "collection is already validated and can no longer be reassigned",
            )),

            (CollectionState::Open, Transition::Validate) => Err(EngineError::conflict(
                "collection cannot be validated without an assigned agent",
            )),
            (CollectionState::Assigned { agent }, Transition::Validate) => {
                Ok(CollectionState::Validated { agent })
            }
            (_, Transition::Validate) => {
                Err(EngineError::conflict("collection is already validated"))
            }

            (CollectionState::Validated { agent }, Transition::Deliver) => {
                Ok(CollectionState::Delivered { agent })
            }
            (CollectionState::Sold { agent, delivered: false }, Transition::Deliver) => {
                Ok(CollectionState::Sold { agent, delivered: true })
            }
            (CollectionState::Delivered { .. }, Transition::Deliver)
            | (CollectionState::Sold { delivered: true, .. }, Transition::Deliver) => {
                Err(EngineError::conflict("collection was already delivered"))
            }
            (_, Transition::Deliver) => Err(EngineError::conflict(
                "collection must be validated before delivery",
            )),

            (CollectionState::Validated { agent }, Transition::Sell) => {
                Ok(CollectionState::Sold { agent, delivered: false })
            }
            (CollectionState::Delivered { agent }, Transition::Sell) => {
                Ok(CollectionState::Sold { agent, delivered: true })
            }
            (CollectionState::Sold { .. }, Transition::Sell) => {
                Err(EngineError::conflict("collection was already sold"))
            }
            (_, Transition::Sell) => Err(EngineError::conflict(
                "collection must be validated by an agent before sale",
            )),
        }
    }

    pub fn assigned_agent(&self) -> Option<AgentId> {
        match *self {
            CollectionState::Open => None,
            CollectionState::Assigned { agent }
            | CollectionState::Validated { agent }
            | CollectionState::Delivered { agent }
            | CollectionState::Sold { agent, .. } => Some(agent),
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(
            self,
            CollectionState::Validated { .. }
                | CollectionState::Delivered { .. }
                | CollectionState::Sold { .. }
        )
    }

    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            CollectionState::Delivered { .. } | CollectionState::Sold { delivered: true, .. }
        )
    }

    pub fn is_sold(&self) -> bool {
        matches!(self, CollectionState::Sold { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub seller: SellerId,
    items: Vec<LineItem>,
    pub total_quantity: Decimal,
    pub total_price: Decimal,
    pub state: CollectionState,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(seller: SellerId) -> Self {
        Self {
            id: CollectionId::new(),
            seller,
            items: Vec::new(),
            total_quantity: Decimal::ZERO,
            total_price: Decimal::ZERO,
            state: CollectionState::Open,
            created_at: Utc::now(),
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn find_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Merge a quantity into an existing line for the material, or append a
    /// new line. The whole line is repriced at the supplied unit price so a
    /// catalog price change applies to the full quantity, not just the delta.
    pub fn add_material(&mut self, material: MaterialId, quantity: Decimal, unit_price: Decimal) {
        match self.items.iter_mut().find(|item| item.material == material) {
            Some(item) => {
                item.quantity += quantity;
                item.unit_price = unit_price;
                item.reprice();
            }
            None => self.items.push(LineItem::new(material, quantity, unit_price)),
        }
        self.recompute_totals();
    }

    /// Remove the line for a material. Absent materials are a no-op.
    pub fn remove_material(&mut self, material: MaterialId) {
        self.items.retain(|item| item.material != material);
        self.recompute_totals();
    }

    pub fn set_item_quantity(
        &mut self,
        id: LineItemId,
        new_quantity: Decimal,
    ) -> Result<(), EngineError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| EngineError::not_found("no such line item in collection"))?;
        item.quantity = new_quantity;
        item.reprice();
        self.recompute_totals();
        Ok(())
    }

    pub fn delete_item(&mut self, id: LineItemId) -> Result<(), EngineError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Err(EngineError::not_found("no such line item in collection"));
        }
        self.recompute_totals();
        Ok(())
    }

    /// Replace the whole line item set (agent-supplied final quantities at
    /// validation time).
    pub fn replace_items(&mut self, items: Vec<LineItem>) {
        self.items = items;
        self.recompute_totals();
    }

    pub fn assign(&mut self, agent: AgentId) -> Result<(), EngineError> {
        self.state = self.state.apply(Transition::Assign(agent))?;
        Ok(())
    }

    pub fn validate(&mut self) -> Result<(), EngineError> {
        self.state = self.state.apply(Transition::Validate)?;
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> Result<(), EngineError> {
        self.state = self.state.apply(Transition::Deliver)?;
        Ok(())
    }

    pub fn mark_sold(&mut self) -> Result<(), EngineError> {
        self.state = self.state.apply(Transition::Sell)?;
        Ok(())
    }

    /// Totals are derived, never independently settable; recomputation here
    /// is the single source of truth.
    fn recompute_totals(&mut self) {
        self.total_quantity = self.items.iter().map(|item| item.quantity).sum();
        self.total_price = self.items.iter().map(|item| item.price).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn totals_track_line_items() {
        let mut collection = Collection::new(SellerId::new());
        let plastic = MaterialId::new();
        let glass = MaterialId::new();

        collection.add_material(plastic, dec(3), dec(150));
        collection.add_material(glass, dec(4), dec(80));
        assert_eq!(collection.total_quantity, dec(7));
        assert_eq!(collection.total_price, dec(3) * dec(150) + dec(4) * dec(80));

        collection.remove_material(glass);
        assert_eq!(collection.total_quantity, dec(3));
        assert_eq!(collection.total_price, dec(450));
    }

    #[test]
    fn adding_same_material_merges_into_one_line() {
        let mut collection = Collection::new(SellerId::new());
        let plastic = MaterialId::new();

        collection.add_material(plastic, dec(3), dec(150));
        collection.add_material(plastic, dec(2), dec(150));

        assert_eq!(collection.items().len(), 1);
        assert_eq!(collection.items()[0].quantity, dec(5));
        assert_eq!(collection.items()[0].price, dec(750));
    }

    #[test]
    fn removing_absent_material_is_a_noop() {
        let mut collection = Collection::new(SellerId::new());
        collection.add_material(MaterialId::new(), dec(2), dec(100));

        let absent = MaterialId::new();
        collection.remove_material(absent);
        collection.remove_material(absent);

        assert_eq!(collection.items().len(), 1);
        assert_eq!(collection.total_quantity, dec(2));
        assert_eq!(collection.total_price, dec(200));
    }

    #[test]
    fn validate_requires_an_assigned_agent() {
        let mut collection = Collection::new(SellerId::new());
        assert!(matches!(collection.validate(), Err(EngineError::Conflict(_))));

        collection.assign(AgentId::new()).unwrap();
        collection.validate().unwrap();
        assert!(collection.state.is_validated());
    }

    #[test]
    fn validate_twice_is_a_conflict() {
        let mut collection = Collection::new(SellerId::new());
        collection.assign(AgentId::new()).unwrap();
        collection.validate().unwrap();
        assert!(matches!(collection.validate(), Err(EngineError::Conflict(_))));
    }

    #[test]
    fn reassignment_is_allowed_until_validation() {
        let mut collection = Collection::new(SellerId::new());
        let first = AgentId::new();
        let second = AgentId::new();

        collection.assign(first).unwrap();
        collection.assign(second).unwrap();
        assert_eq!(collection.state.assigned_agent(), Some(second));

        collection.validate().unwrap();
        assert!(matches!(
            collection.assign(first),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn sold_collection_can_still_be_delivered_once() {
        let mut collection = Collection::new(SellerId::new());
        let agent = AgentId::new();
        collection.assign(agent).unwrap();
        collection.validate().unwrap();
        collection.mark_sold().unwrap();
        assert!(!collection.state.is_delivered());

        collection.mark_delivered().unwrap();
        assert!(collection.state.is_delivered());
        assert!(matches!(
            collection.mark_delivered(),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn sale_is_a_one_way_transition() {
        let mut collection = Collection::new(SellerId::new());
        collection.assign(AgentId::new()).unwrap();

        // Not validated yet.
        assert!(matches!(collection.mark_sold(), Err(EngineError::Conflict(_))));

        collection.validate().unwrap();
        collection.mark_delivered().unwrap();
        collection.mark_sold().unwrap();
        assert!(collection.state.is_sold());
        assert!(collection.state.is_delivered());
        assert!(matches!(collection.mark_sold(), Err(EngineError::Conflict(_))));
    }
}
