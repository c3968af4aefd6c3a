// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Delivery aggregate: an agent-side batch of validated collections.
//!
//! Financial fields are computed once, from the fee in effect when the
//! batch was aggregated, and are immutable afterwards. A later fee change
//! never alters an existing delivery's profit figures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::collection::Collection;
use crate::domain::{AgentId, BankId, MaterialId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(pub Uuid);

impl DeliveryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupStatus {
    #[serde(rename = "In-Store")]
    InStore,
    Delivered,
}

/// Shared by deliveries (agent compensation) and sales (seller payout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Processing,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub material: MaterialId,
    pub quantity: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub agent: AgentId,
    pub materials: Vec<DeliveryLine>,
    pub total_quantity: Decimal,
    pub total_profit: Decimal,
    pub pickup_status: PickupStatus,
    pub agent_payment_status: PaymentStatus,
    pub payout_bank: Option<BankId>,
    pub created_at: DateTime<Utc>,
}

impl Delivery {
    /// Aggregate the line items of the given collections, pricing every
    /// line with the single fee snapshot for this batch.
    pub fn from_collections(
        agent: AgentId,
        collections: &[Collection],
        fee_per_kg: Decimal,
        payout_bank: Option<BankId>,
    ) -> Self {
        let mut materials = Vec::new();
        let mut total_quantity = Decimal::ZERO;
        let mut total_profit = Decimal::ZERO;

        for collection in collections {
            for item in collection.items() {
                let profit = item.quantity * fee_per_kg;
                materials.push(DeliveryLine {
                    material: item.material,
                    quantity: item.quantity,
                    profit,
                });
                total_quantity += item.quantity;
                total_profit += profit;
            }
        }

        Self {
            id: DeliveryId::new(),
            agent,
            materials,
            total_quantity,
            total_profit,
            pickup_status: PickupStatus::InStore,
            agent_payment_status: PaymentStatus::Processing,
            payout_bank,
            created_at: Utc::now(),
        }
    }
}
