use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::collection::{Collection, LineItemId};
use crate::domain::error::EngineError;
use crate::domain::repository::{CollectionRepository, MaterialPriceLookup};
use crate::domain::{MaterialId, SellerId};
use crate::infrastructure::retry::with_read_retry;

/// Seller-facing cart operations, all gated on the collection still being
/// un-validated. Quantities are frozen once an agent validates.
#[async_trait]
pub trait CollectionService: Send + Sync {
    async fn create_collection(&self, seller: SellerId) -> Result<Collection, EngineError>;

    async fn my_collection(&self, seller: SellerId) -> Result<Collection, EngineError>;

    /// Add a quantity of a material, merging into an existing line for the
    /// same material. Creates the collection implicitly if the seller has
    /// none.
    async fn add_item(
        &self,
        seller: SellerId,
        material: MaterialId,
        quantity: Decimal,
    ) -> Result<Collection, EngineError>;

    /// Remove a material's line. Absent materials are a silent no-op.
    async fn remove_item(
        &self,
        seller: SellerId,
        material: MaterialId,
    ) -> Result<Collection, EngineError>;

    async fn set_item_quantity(
        &self,
        seller: SellerId,
        item: LineItemId,
        new_quantity: Decimal,
    ) -> Result<Collection, EngineError>;

    async fn delete_collection(&self, seller: SellerId) -> Result<(), EngineError>;
}

pub struct StandardCollectionService {
    collections: Arc<dyn CollectionRepository>,
    materials: Arc<dyn MaterialPriceLookup>,
}

impl StandardCollectionService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        materials: Arc<dyn MaterialPriceLookup>,
    ) -> Self {
        Self {
            collections,
            materials,
        }
    }

    async fn open_collection(&self, seller: SellerId) -> Result<Option<Collection>, EngineError> {
        Ok(with_read_retry("collections.find_open_for_seller", || {
            self.collections.find_open_for_seller(seller)
        })
        .await?)
    }
}

#[async_trait]
impl CollectionService for StandardCollectionService {
    async fn create_collection(&self, seller: SellerId) -> Result<Collection, EngineError> {
        if self.open_collection(seller).await?.is_some() {
            return Err(EngineError::conflict(
                "seller already has an open collection",
            ));
        }
        let collection = Collection::new(seller);
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn my_collection(&self, seller: SellerId) -> Result<Collection, EngineError> {
        self.open_collection(seller)
            .await?
            .ok_or_else(|| EngineError::not_found("no collection found"))
    }

    async fn add_item(
        &self,
        seller: SellerId,
        material: MaterialId,
        quantity: Decimal,
    ) -> Result<Collection, EngineError> {
        if quantity <= Decimal::ZERO {
            return Err(EngineError::validation("quantity must be positive"));
        }
        let unit_price = self
            .materials
            .unit_price(material)
            .await?
            .ok_or_else(|| EngineError::not_found("no material found with that id"))?;

        let mut collection = match self.open_collection(seller).await? {
            Some(collection) if collection.state.is_validated() => {
                return Err(EngineError::conflict(
                    "collection is already validated; finalize the sale first",
                ));
            }
            Some(collection) => collection,
            None => Collection::new(seller),
        };

        collection.add_material(material, quantity, unit_price);
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn remove_item(
        &self,
        seller: SellerId,
        material: MaterialId,
    ) -> Result<Collection, EngineError> {
        let mut collection = self.my_collection(seller).await?;
        if collection.state.is_validated() {
            return Err(EngineError::conflict(
                "collection is already validated; items can no longer be removed",
            ));
        }
        collection.remove_material(material);
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn set_item_quantity(
        &self,
        seller: SellerId,
        item: LineItemId,
        new_quantity: Decimal,
    ) -> Result<Collection, EngineError> {
        if new_quantity < Decimal::ONE {
            return Err(EngineError::validation(
                "quantity must be at least 1; use removal instead of zero",
            ));
        }
        let mut collection = self.my_collection(seller).await?;
        if collection.state.is_validated() {
            return Err(EngineError::conflict(
                "collection is already validated; quantities are frozen",
            ));
        }
        collection.set_item_quantity(item, new_quantity)?;
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    async fn delete_collection(&self, seller: SellerId) -> Result<(), EngineError> {
        let collection = self.my_collection(seller).await?;
        if collection.state.is_validated() {
            return Err(EngineError::conflict(
                "validated collections can no longer be deleted by the seller",
            ));
        }
        self.collections.delete(collection.id).await?;
        Ok(())
    }
}
