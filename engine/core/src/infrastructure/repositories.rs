// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory repository implementations.
//!
//! Thread-safe HashMap-backed storage for development and testing. The fee
//! registry's close-old/open-new supersession runs under a single write
//! lock, which is the serialization point the single-active-entry
//! invariant requires.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::collection::{Collection, CollectionId};
use crate::domain::delivery::{Delivery, DeliveryId};
use crate::domain::fee::FeeEntry;
use crate::domain::repository::{
    AgentDirectory, BankAccount, BankDirectory, CollectionRepository, DeliveryRepository,
    FeeRepository, MaterialPriceLookup, RepositoryError, SaleRepository,
};
use crate::domain::sale::{Sale, SaleId};
use crate::domain::{AgentId, BankId, MaterialId, SellerId};

#[derive(Clone, Default)]
pub struct InMemoryCollectionRepository {
    collections: Arc<RwLock<HashMap<CollectionId, Collection>>>,
}

impl InMemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionRepository for InMemoryCollectionRepository {
    async fn save(&self, collection: &Collection) -> Result<(), RepositoryError> {
        let mut collections = self.collections.write().unwrap();
        collections.insert(collection.id, collection.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[CollectionId]) -> Result<Vec<Collection>, RepositoryError> {
        let collections = self.collections.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| collections.get(id).cloned())
            .collect())
    }

    async fn find_open_for_seller(
        &self,
        seller: SellerId,
    ) -> Result<Option<Collection>, RepositoryError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .values()
            .find(|c| c.seller == seller && !c.state.is_sold())
            .cloned())
    }

    async fn find_pending_validation(
        &self,
        agent: AgentId,
    ) -> Result<Vec<Collection>, RepositoryError> {
        let collections = self.collections.read().unwrap();
        let mut pending: Vec<Collection> = collections
            .values()
            .filter(|c| c.state.assigned_agent() == Some(agent) && !c.state.is_validated())
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.created_at);
        Ok(pending)
    }

    async fn find_validated_undelivered(
        &self,
        agent: AgentId,
    ) -> Result<Vec<Collection>, RepositoryError> {
        let collections = self.collections.read().unwrap();
        let mut validated: Vec<Collection> = collections
            .values()
            .filter(|c| {
                c.state.assigned_agent() == Some(agent)
                    && c.state.is_validated()
                    && !c.state.is_delivered()
            })
            .cloned()
            .collect();
        validated.sort_by_key(|c| c.created_at);
        Ok(validated)
    }

    async fn delete(&self, id: CollectionId) -> Result<(), RepositoryError> {
        let mut collections = self.collections.write().unwrap();
        collections.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFeeRegistry {
    entries: Arc<RwLock<Vec<FeeEntry>>>,
}

impl InMemoryFeeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeeRepository for InMemoryFeeRegistry {
    async fn current(&self) -> Result<Option<FeeEntry>, RepositoryError> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.is_open())
            .max_by_key(|e| e.effective_from)
            .cloned())
    }

    async fn supersede(&self, entry: FeeEntry) -> Result<FeeEntry, RepositoryError> {
        // Close-old and insert-new under one write lock so concurrent
        // supersessions serialize and exactly one entry stays open.
        let mut entries = self.entries.write().unwrap();
        let now = Utc::now();
        for existing in entries.iter_mut().filter(|e| e.is_open()) {
            existing.close(now);
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn history(&self) -> Result<Vec<FeeEntry>, RepositoryError> {
        let entries = self.entries.read().unwrap();
        let mut history = entries.clone();
        history.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
        Ok(history)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDeliveryRepository {
    deliveries: Arc<RwLock<HashMap<DeliveryId, Delivery>>>,
}

impl InMemoryDeliveryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn save(&self, delivery: &Delivery) -> Result<(), RepositoryError> {
        let mut deliveries = self.deliveries.write().unwrap();
        deliveries.insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError> {
        let deliveries = self.deliveries.read().unwrap();
        Ok(deliveries.get(&id).cloned())
    }

    async fn find_by_agent(&self, agent: AgentId) -> Result<Vec<Delivery>, RepositoryError> {
        let deliveries = self.deliveries.read().unwrap();
        let mut mine: Vec<Delivery> = deliveries
            .values()
            .filter(|d| d.agent == agent)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[derive(Clone, Default)]
pub struct InMemorySaleRepository {
    sales: Arc<RwLock<HashMap<SaleId, Sale>>>,
}

impl InMemorySaleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn save(&self, sale: &Sale) -> Result<(), RepositoryError> {
        let mut sales = self.sales.write().unwrap();
        sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let sales = self.sales.read().unwrap();
        Ok(sales.get(&id).cloned())
    }

    async fn find_by_seller(&self, seller: SellerId) -> Result<Vec<Sale>, RepositoryError> {
        let sales = self.sales.read().unwrap();
        let mut mine: Vec<Sale> = sales
            .values()
            .filter(|s| s.seller == seller)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

/// Material catalog stand-in for tests and development.
#[derive(Clone, Default)]
pub struct InMemoryMaterialCatalog {
    prices: Arc<RwLock<HashMap<MaterialId, Decimal>>>,
}

impl InMemoryMaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, material: MaterialId, price_per_kg: Decimal) {
        let mut prices = self.prices.write().unwrap();
        prices.insert(material, price_per_kg);
    }
}

#[async_trait]
impl MaterialPriceLookup for InMemoryMaterialCatalog {
    async fn unit_price(&self, material: MaterialId) -> Result<Option<Decimal>, RepositoryError> {
        let prices = self.prices.read().unwrap();
        Ok(prices.get(&material).copied())
    }
}

/// Bank-account store stand-in.
#[derive(Clone, Default)]
pub struct InMemoryBankDirectory {
    accounts: Arc<RwLock<HashMap<BankId, BankAccount>>>,
}

impl InMemoryBankDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: BankAccount) {
        let mut accounts = self.accounts.write().unwrap();
        accounts.insert(account.id, account);
    }
}

#[async_trait]
impl BankDirectory for InMemoryBankDirectory {
    async fn find_for_owner(
        &self,
        bank: BankId,
        owner: SellerId,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        let accounts = self.accounts.read().unwrap();
        Ok(accounts
            .get(&bank)
            .filter(|account| account.owner == owner)
            .cloned())
    }
}

/// User-profile stand-in providing agent display names.
#[derive(Clone, Default)]
pub struct InMemoryAgentDirectory {
    names: Arc<RwLock<HashMap<AgentId, String>>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agent: AgentId, name: impl Into<String>) {
        let mut names = self.names.write().unwrap();
        names.insert(agent, name.into());
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn display_name(&self, agent: AgentId) -> Result<Option<String>, RepositoryError> {
        let names = self.names.read().unwrap();
        Ok(names.get(&agent).cloned())
    }
}
