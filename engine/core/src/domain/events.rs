// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Outbound lifecycle events.
//!
//! These are consumed by the notification, referral and reward subsystems
//! (external collaborators). Emission is fire-and-forget: a failed or
//! unobserved event never converts a successful state transition into a
//! reported failure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::collection::CollectionId;
use crate::domain::sale::SaleId;
use crate::domain::SellerId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    AgentValidation {
        seller: SellerId,
        collection_id: CollectionId,
        agent_name: String,
        validated_at: DateTime<Utc>,
    },
    OrderCancelled {
        seller: SellerId,
        collection_id: CollectionId,
        agent_name: String,
        cancelled_at: DateTime<Utc>,
    },
    AgentRedirect {
        seller: SellerId,
        collection_id: CollectionId,
        from_agent_name: String,
        to_agent_name: String,
        redirected_at: DateTime<Utc>,
    },
    SaleCompleted {
        seller: SellerId,
        sale_id: SaleId,
        collection_id: CollectionId,
        total_price: Decimal,
        completed_at: DateTime<Utc>,
    },
    PaymentReceived {
        seller: SellerId,
        sale_id: SaleId,
        amount: Decimal,
        received_at: DateTime<Utc>,
    },
    /// Nudges the referral subsystem to re-check approval for the seller
    /// after a completed sale.
    ReferralRecheck {
        seller: SellerId,
        triggered_at: DateTime<Utc>,
    },
    /// The chat thread tied to a collection is cleared once the sale is
    /// confirmed.
    ChatCleared {
        collection_id: CollectionId,
        cleared_at: DateTime<Utc>,
    },
}

impl MarketplaceEvent {
    /// The user a push notification for this event would target, if any.
    pub fn target_seller(&self) -> Option<SellerId> {
        match self {
            MarketplaceEvent::AgentValidation { seller, .. }
            | MarketplaceEvent::OrderCancelled { seller, .. }
            | MarketplaceEvent::AgentRedirect { seller, .. }
            | MarketplaceEvent::SaleCompleted { seller, .. }
            | MarketplaceEvent::PaymentReceived { seller, .. }
            | MarketplaceEvent::ReferralRecheck { seller, .. } => Some(*seller),
            MarketplaceEvent::ChatCleared { .. } => None,
        }
    }
}
