// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Persistence and collaborator ports.
//!
//! One repository per aggregate root, interface defined here in the domain
//! layer and implemented in `crate::infrastructure::repositories`:
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `CollectionRepository` | `Collection` | `InMemoryCollectionRepository` |
//! | `FeeRepository` | `FeeEntry` | `InMemoryFeeRegistry` |
//! | `DeliveryRepository` | `Delivery` | `InMemoryDeliveryRepository` |
//! | `SaleRepository` | `Sale` | `InMemorySaleRepository` |
//!
//! The lookup traits at the bottom are ports onto external collaborators
//! (material catalog, bank-account store, user profiles); the engine only
//! ever reads through them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::collection::{Collection, CollectionId};
use crate::domain::delivery::{Delivery, DeliveryId};
use crate::domain::fee::FeeEntry;
use crate::domain::sale::{Sale, SaleId};
use crate::domain::{AgentId, BankId, MaterialId, SellerId};

/// Repository errors. `Timeout` and `Storage` are transient (retryable);
/// domain rule violations never originate here.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Storage(_))
    }
}

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Save collection (create or update).
    async fn save(&self, collection: &Collection) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError>;

    /// Fetch the requested ids, silently skipping unknown ones.
    async fn find_by_ids(&self, ids: &[CollectionId]) -> Result<Vec<Collection>, RepositoryError>;

    /// The seller's open (unsold) collection, if any. At most one exists.
    async fn find_open_for_seller(
        &self,
        seller: SellerId,
    ) -> Result<Option<Collection>, RepositoryError>;

    /// Collections assigned to the agent and awaiting validation.
    async fn find_pending_validation(
        &self,
        agent: AgentId,
    ) -> Result<Vec<Collection>, RepositoryError>;

    /// Validated collections of the agent not yet rolled into a delivery.
    async fn find_validated_undelivered(
        &self,
        agent: AgentId,
    ) -> Result<Vec<Collection>, RepositoryError>;

    async fn delete(&self, id: CollectionId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FeeRepository: Send + Sync {
    /// The single active open entry, or `None` on an empty/fully-closed
    /// registry.
    async fn current(&self) -> Result<Option<FeeEntry>, RepositoryError>;

    /// Atomically close any open entry and insert the new one. Two
    /// concurrent calls must not both observe "no active entry".
    async fn supersede(&self, entry: FeeEntry) -> Result<FeeEntry, RepositoryError>;

    /// Full audit trail, newest first.
    async fn history(&self) -> Result<Vec<FeeEntry>, RepositoryError>;
}

#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn save(&self, delivery: &Delivery) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError>;

    /// The agent's deliveries, newest first.
    async fn find_by_agent(&self, agent: AgentId) -> Result<Vec<Delivery>, RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn save(&self, sale: &Sale) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError>;

    /// The seller's sales, newest first.
    async fn find_by_seller(&self, seller: SellerId) -> Result<Vec<Sale>, RepositoryError>;
}

/// Price-per-kilogram lookup against the material catalog.
#[async_trait]
pub trait MaterialPriceLookup: Send + Sync {
    async fn unit_price(&self, material: MaterialId) -> Result<Option<Decimal>, RepositoryError>;
}

/// Payout destination as stored by the bank-account subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankId,
    pub owner: SellerId,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

/// Bank-account store port. Lookups are ownership-scoped: a bank id that
/// exists but belongs to another user resolves to `None`.
#[async_trait]
pub trait BankDirectory: Send + Sync {
    async fn find_for_owner(
        &self,
        bank: BankId,
        owner: SellerId,
    ) -> Result<Option<BankAccount>, RepositoryError>;
}

/// User-profile port, used only to render agent display names in
/// notifications.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn display_name(&self, agent: AgentId) -> Result<Option<String>, RepositoryError>;
}
