// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod collection;
pub mod delivery;
pub mod error;
pub mod events;
pub mod fee;
pub mod repository;
pub mod sale;

pub use collection::{Collection, CollectionId, CollectionState, LineItem, LineItemId, Transition};
pub use delivery::{Delivery, DeliveryId, DeliveryLine, PaymentStatus, PickupStatus};
pub use error::EngineError;
pub use events::MarketplaceEvent;
pub use fee::{default_fee_per_kg, FeeEntry, FeeEntryId};
pub use repository::{
    AgentDirectory, BankAccount, BankDirectory, CollectionRepository, DeliveryRepository,
    FeeRepository, MaterialPriceLookup, RepositoryError, SaleRepository,
};
pub use sale::{BankSnapshot, Sale, SaleId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seller side of the marketplace. Supplied by the identity layer; the
/// engine trusts it and performs its own ownership checks on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SellerId(pub Uuid);

impl SellerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SellerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SellerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Field agent who physically verifies a seller's materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Administrator identity, used for fee changes and payout status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminId(pub Uuid);

impl AdminId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AdminId {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry in the static material catalog (external collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub Uuid);

impl MaterialId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Payout destination reference held by the bank-account store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankId(pub Uuid);

impl BankId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BankId {
    fn default() -> Self {
        Self::new()
    }
}
