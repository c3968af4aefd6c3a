// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! End-to-end lifecycle tests: seller cart -> agent validation ->
//! delivery aggregation and sale finalization, against the in-memory
//! infrastructure.

use std::sync::Arc;

use rust_decimal::Decimal;

use kolekta_engine_core::application::{
    CollectionService, DeliveryService, FeeService, FinalLineItem, SaleService,
    StandardCollectionService, StandardDeliveryService, StandardFeeService, StandardSaleService,
    StandardValidationService, ValidationService,
};
use kolekta_engine_core::domain::{
    AdminId, AgentId, BankAccount, BankId, CollectionRepository, EngineError, MarketplaceEvent,
    MaterialId, PaymentStatus, PickupStatus, SellerId,
};
use kolekta_engine_core::infrastructure::{
    EventBus, EventReceiver, InMemoryAgentDirectory, InMemoryBankDirectory,
    InMemoryCollectionRepository, InMemoryDeliveryRepository, InMemoryFeeRegistry,
    InMemoryMaterialCatalog, InMemorySaleRepository,
};

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

struct Engine {
    collections: Arc<InMemoryCollectionRepository>,
    catalog: Arc<InMemoryMaterialCatalog>,
    banks: Arc<InMemoryBankDirectory>,
    agent_names: Arc<InMemoryAgentDirectory>,
    bus: EventBus,
    cart: StandardCollectionService,
    validation: StandardValidationService,
    delivery: StandardDeliveryService,
    sale: StandardSaleService,
    fees: Arc<dyn FeeService>,
}

fn engine() -> Engine {
    let collections = Arc::new(InMemoryCollectionRepository::new());
    let deliveries = Arc::new(InMemoryDeliveryRepository::new());
    let sales = Arc::new(InMemorySaleRepository::new());
    let registry = Arc::new(InMemoryFeeRegistry::new());
    let catalog = Arc::new(InMemoryMaterialCatalog::new());
    let banks = Arc::new(InMemoryBankDirectory::new());
    let agent_names = Arc::new(InMemoryAgentDirectory::new());
    let bus = EventBus::new(64);

    let fees: Arc<dyn FeeService> = Arc::new(StandardFeeService::new(registry));
    Engine {
        cart: StandardCollectionService::new(collections.clone(), catalog.clone()),
        validation: StandardValidationService::new(
            collections.clone(),
            catalog.clone(),
            agent_names.clone(),
            bus.clone(),
        ),
        delivery: StandardDeliveryService::new(collections.clone(), deliveries, fees.clone()),
        sale: StandardSaleService::new(collections.clone(), sales, banks.clone(), bus.clone()),
        fees,
        collections,
        catalog,
        banks,
        agent_names,
        bus,
    }
}

impl Engine {
    fn material(&self, price_per_kg: i64) -> MaterialId {
        let material = MaterialId::new();
        self.catalog.insert(material, dec(price_per_kg));
        material
    }

    fn bank(&self, owner: SellerId) -> BankId {
        let id = BankId::new();
        self.banks.insert(BankAccount {
            id,
            owner,
            bank_name: "First Bank".into(),
            account_number: "0123456789".into(),
            account_name: "A. Seller".into(),
        });
        id
    }

    /// Seller with one validated collection of `quantity` kg of a material
    /// priced at `price` per kg, assigned to `agent`.
    async fn validated_collection(
        &self,
        agent: AgentId,
        quantity: i64,
        price: i64,
    ) -> (SellerId, kolekta_engine_core::domain::CollectionId) {
        let seller = SellerId::new();
        let material = self.material(price);
        let collection = self
            .cart
            .add_item(seller, material, dec(quantity))
            .await
            .unwrap();
        self.validation
            .assign_agent(collection.id, seller, agent)
            .await
            .unwrap();
        self.validation
            .validate(collection.id, agent, None)
            .await
            .unwrap();
        (seller, collection.id)
    }
}

fn drain(receiver: &mut EventReceiver) -> Vec<MarketplaceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn scenario_a_same_material_merges_into_one_line() {
    let engine = engine();
    let seller = SellerId::new();
    let material = engine.material(150);

    engine.cart.add_item(seller, material, dec(3)).await.unwrap();
    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();

    assert_eq!(collection.items().len(), 1);
    assert_eq!(collection.items()[0].quantity, dec(5));
    assert_eq!(collection.total_quantity, dec(5));
    assert_eq!(collection.total_price, dec(750));
}

#[tokio::test]
async fn scenario_b_agent_adjusts_then_last_item_delete_is_rejected() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let material = engine.material(150);

    let collection = engine.cart.add_item(seller, material, dec(5)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();

    let item = collection.items()[0].id;
    let adjusted = engine
        .validation
        .update_item(collection.id, agent, item, dec(2))
        .await
        .unwrap();
    assert_eq!(adjusted.total_quantity, dec(2));
    assert_eq!(adjusted.total_price, dec(300));

    let result = engine.validation.delete_item(collection.id, agent, item).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));

    // Nothing was mutated by the failed delete.
    let unchanged = engine.cart.my_collection(seller).await.unwrap();
    assert_eq!(unchanged.items().len(), 1);
    assert_eq!(unchanged.total_quantity, dec(2));
}

#[tokio::test]
async fn scenario_c_deliveries_keep_their_fee_snapshot() {
    let engine = engine();
    let agent = AgentId::new();

    // Empty registry resolves to the default.
    assert_eq!(engine.fees.current_fee().await.unwrap(), dec(20));

    let (_, first) = engine.validated_collection(agent, 4, 100).await;
    let before = engine
        .delivery
        .create_delivery(agent, vec![first], None)
        .await
        .unwrap();
    assert_eq!(before.total_profit, dec(80));

    engine.fees.set_fee(dec(25), AdminId::new()).await.unwrap();

    let (_, second) = engine.validated_collection(agent, 4, 100).await;
    let after = engine
        .delivery
        .create_delivery(agent, vec![second], None)
        .await
        .unwrap();
    assert_eq!(after.total_profit, dec(100));

    // The earlier delivery's figures are never recomputed.
    assert_eq!(before.total_profit, dec(80));
}

#[tokio::test]
async fn scenario_d_delivery_aggregates_collections_and_marks_them() {
    let engine = engine();
    let agent = AgentId::new();
    let stranger = AgentId::new();

    let (_, first) = engine.validated_collection(agent, 3, 150).await;
    let (_, second) = engine.validated_collection(agent, 7, 80).await;
    // Belongs to another agent; must be silently dropped from the batch.
    let (_, foreign) = engine.validated_collection(stranger, 5, 80).await;

    let delivery = engine
        .delivery
        .create_delivery(agent, vec![first, second, foreign], None)
        .await
        .unwrap();

    assert_eq!(delivery.total_quantity, dec(10));
    assert_eq!(delivery.total_profit, dec(200)); // default fee 20/kg
    assert_eq!(delivery.pickup_status, PickupStatus::InStore);
    assert_eq!(delivery.agent_payment_status, PaymentStatus::Processing);

    for id in [first, second] {
        let collection = engine.collections.find_by_id(id).await.unwrap().unwrap();
        assert!(collection.state.is_delivered());
    }
    let untouched = engine.collections.find_by_id(foreign).await.unwrap().unwrap();
    assert!(!untouched.state.is_delivered());

    // Both collections are spent now.
    let again = engine.delivery.create_delivery(agent, vec![first, second], None).await;
    assert!(matches!(again, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn scenario_e_sale_requires_validation_and_emits_once() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let material = engine.material(150);
    let bank = engine.bank(seller);

    let collection = engine.cart.add_item(seller, material, dec(5)).await.unwrap();

    let mut receiver = engine.bus.subscribe();

    let premature = engine.sale.create_sale(seller, collection.id, bank).await;
    assert!(matches!(premature, Err(EngineError::Conflict(_))));

    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();
    engine
        .validation
        .validate(collection.id, agent, None)
        .await
        .unwrap();

    let sale = engine.sale.create_sale(seller, collection.id, bank).await.unwrap();
    assert_eq!(sale.total_price, dec(750));
    assert_eq!(sale.bank_details.bank_name, "First Bank");

    let sold = engine
        .collections
        .find_by_id(collection.id)
        .await
        .unwrap()
        .unwrap();
    assert!(sold.state.is_sold());

    let events = drain(&mut receiver);
    let completed = events
        .iter()
        .filter(|e| matches!(e, MarketplaceEvent::SaleCompleted { .. }))
        .count();
    assert_eq!(completed, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, MarketplaceEvent::ReferralRecheck { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, MarketplaceEvent::ChatCleared { .. })));

    // One-way: a second sale of the same collection is a conflict.
    let again = engine.sale.create_sale(seller, collection.id, bank).await;
    assert!(matches!(again, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn one_open_collection_per_seller() {
    let engine = engine();
    let seller = SellerId::new();

    engine.cart.create_collection(seller).await.unwrap();
    let second = engine.cart.create_collection(seller).await;
    assert!(matches!(second, Err(EngineError::Conflict(_))));

    // The implicit path joins the existing collection instead.
    let material = engine.material(100);
    let collection = engine.cart.add_item(seller, material, dec(1)).await.unwrap();
    assert_eq!(collection.items().len(), 1);
}

#[tokio::test]
async fn removing_an_absent_material_is_idempotent() {
    let engine = engine();
    let seller = SellerId::new();
    let material = engine.material(100);
    let absent = MaterialId::new();

    engine.cart.add_item(seller, material, dec(2)).await.unwrap();

    let first = engine.cart.remove_item(seller, absent).await.unwrap();
    let second = engine.cart.remove_item(seller, absent).await.unwrap();
    assert_eq!(first.total_quantity, dec(2));
    assert_eq!(second.total_quantity, dec(2));
    assert_eq!(second.total_price, dec(200));
}

#[tokio::test]
async fn unknown_material_is_not_found() {
    let engine = engine();
    let result = engine
        .cart
        .add_item(SellerId::new(), MaterialId::new(), dec(1))
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn zero_or_negative_quantities_are_rejected() {
    let engine = engine();
    let seller = SellerId::new();
    let material = engine.material(100);

    let zero = engine.cart.add_item(seller, material, dec(0)).await;
    assert!(matches!(zero, Err(EngineError::Validation(_))));

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    let item = collection.items()[0].id;
    let below_one = engine.cart.set_item_quantity(seller, item, dec(0)).await;
    assert!(matches!(below_one, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn duplicate_ids_in_a_delivery_batch_count_once() {
    let engine = engine();
    let agent = AgentId::new();
    let (_, collection) = engine.validated_collection(agent, 4, 100).await;

    let delivery = engine
        .delivery
        .create_delivery(agent, vec![collection, collection], None)
        .await
        .unwrap();

    assert_eq!(delivery.materials.len(), 1);
    assert_eq!(delivery.total_quantity, dec(4));
    assert_eq!(delivery.total_profit, dec(80)); // 4 kg at the default 20/kg
}

#[tokio::test]
async fn only_the_owning_seller_may_assign_an_agent() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let thief = AgentId::new();
    let material = engine.material(100);

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();

    let hijack = engine
        .validation
        .assign_agent(collection.id, SellerId::new(), thief)
        .await;
    assert!(matches!(hijack, Err(EngineError::Forbidden(_))));

    let unchanged = engine.cart.my_collection(seller).await.unwrap();
    assert_eq!(unchanged.state.assigned_agent(), Some(agent));
}

#[tokio::test]
async fn validate_twice_is_a_conflict() {
    let engine = engine();
    let agent = AgentId::new();
    let (_, collection) = engine.validated_collection(agent, 2, 100).await;

    let again = engine.validation.validate(collection, agent, None).await;
    assert!(matches!(again, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn only_the_assigned_agent_may_validate() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let impostor = AgentId::new();
    let material = engine.material(100);

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();

    let result = engine.validation.validate(collection.id, impostor, None).await;
    assert!(matches!(result, Err(EngineError::Forbidden(_))));

    // The failed call left the collection un-validated.
    let unchanged = engine.cart.my_collection(seller).await.unwrap();
    assert!(!unchanged.state.is_validated());
}

#[tokio::test]
async fn validate_with_final_items_reprices_the_collection() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let plastic = engine.material(150);
    let glass = engine.material(80);

    let collection = engine.cart.add_item(seller, plastic, dec(10)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();

    let finalized = engine
        .validation
        .validate(
            collection.id,
            agent,
            Some(vec![
                FinalLineItem { material: plastic, quantity: dec(8) },
                FinalLineItem { material: glass, quantity: dec(3) },
            ]),
        )
        .await
        .unwrap();

    assert!(finalized.state.is_validated());
    assert_eq!(finalized.items().len(), 2);
    assert_eq!(finalized.total_quantity, dec(11));
    assert_eq!(finalized.total_price, dec(8) * dec(150) + dec(3) * dec(80));
}

#[tokio::test]
async fn redirect_reassigns_and_notifies_the_seller() {
    let engine = engine();
    let seller = SellerId::new();
    let first = AgentId::new();
    let second = AgentId::new();
    engine.agent_names.insert(first, "Ade");
    engine.agent_names.insert(second, "Bola");
    let material = engine.material(100);

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, first)
        .await
        .unwrap();

    let to_self = engine
        .validation
        .redirect_order(collection.id, first, first)
        .await;
    assert!(matches!(to_self, Err(EngineError::Validation(_))));

    let by_stranger = engine
        .validation
        .redirect_order(collection.id, second, first)
        .await;
    assert!(matches!(by_stranger, Err(EngineError::Forbidden(_))));

    let mut receiver = engine.bus.subscribe();
    let redirected = engine
        .validation
        .redirect_order(collection.id, first, second)
        .await
        .unwrap();
    assert_eq!(redirected.state.assigned_agent(), Some(second));

    match receiver.try_recv().unwrap() {
        MarketplaceEvent::AgentRedirect {
            seller: target,
            from_agent_name,
            to_agent_name,
            ..
        } => {
            assert_eq!(target, seller);
            assert_eq!(from_agent_name, "Ade");
            assert_eq!(to_agent_name, "Bola");
        }
        other => panic!("wrong event: {:?}", other),
    }
}

#[tokio::test]
async fn cancel_deletes_the_collection_and_notifies() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    engine.agent_names.insert(agent, "Ade");
    let material = engine.material(100);

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();

    let mut receiver = engine.bus.subscribe();
    engine.validation.cancel_order(collection.id, agent).await.unwrap();

    let gone = engine.cart.my_collection(seller).await;
    assert!(matches!(gone, Err(EngineError::NotFound(_))));

    match receiver.try_recv().unwrap() {
        MarketplaceEvent::OrderCancelled { agent_name, .. } => assert_eq!(agent_name, "Ade"),
        other => panic!("wrong event: {:?}", other),
    }
}

#[tokio::test]
async fn paid_sale_status_cannot_be_reversed() {
    let engine = engine();
    let seller = SellerId::new();
    let agent = AgentId::new();
    let material = engine.material(150);
    let bank = engine.bank(seller);

    let collection = engine.cart.add_item(seller, material, dec(2)).await.unwrap();
    engine
        .validation
        .assign_agent(collection.id, seller, agent)
        .await
        .unwrap();
    engine
        .validation
        .validate(collection.id, agent, None)
        .await
        .unwrap();
    let sale = engine.sale.create_sale(seller, collection.id, bank).await.unwrap();

    let mut receiver = engine.bus.subscribe();
    let paid = engine
        .sale
        .update_sale_status(sale.id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);

    match receiver.try_recv().unwrap() {
        MarketplaceEvent::PaymentReceived { amount, .. } => assert_eq!(amount, dec(300)),
        other => panic!("wrong event: {:?}", other),
    }

    let reversed = engine
        .sale
        .update_sale_status(sale.id, PaymentStatus::Processing)
        .await;
    assert!(matches!(reversed, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn someone_elses_bank_account_is_not_found() {
    let engine = engine();
    let agent = AgentId::new();
    let (seller, collection) = engine.validated_collection(agent, 2, 100).await;
    let foreign_bank = engine.bank(SellerId::new());

    let result = engine.sale.create_sale(seller, collection, foreign_bank).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    // The failed sale left the collection unsold.
    let unchanged = engine.collections.find_by_id(collection).await.unwrap().unwrap();
    assert!(!unchanged.state.is_sold());
}

#[tokio::test]
async fn sold_but_undelivered_collection_still_joins_a_delivery() {
    let engine = engine();
    let agent = AgentId::new();
    let (seller, collection) = engine.validated_collection(agent, 4, 100).await;
    let bank = engine.bank(seller);

    engine.sale.create_sale(seller, collection, bank).await.unwrap();

    let delivery = engine
        .delivery
        .create_delivery(agent, vec![collection], None)
        .await
        .unwrap();
    assert_eq!(delivery.total_quantity, dec(4));

    let settled = engine.collections.find_by_id(collection).await.unwrap().unwrap();
    assert!(settled.state.is_sold());
    assert!(settled.state.is_delivered());
}

#[tokio::test]
async fn validation_history_previews_profit_at_the_current_fee() {
    let engine = engine();
    let agent = AgentId::new();
    let (_, _collection) = engine.validated_collection(agent, 3, 100).await;

    engine.fees.set_fee(dec(30), AdminId::new()).await.unwrap();

    let previews = engine.delivery.validation_history(agent).await.unwrap();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].fee_per_kg, dec(30));
    assert_eq!(previews[0].total_profit, dec(90));
}

#[tokio::test]
async fn delivery_status_transitions_are_unconstrained() {
    let engine = engine();
    let agent = AgentId::new();
    let (_, collection) = engine.validated_collection(agent, 2, 100).await;
    let delivery = engine
        .delivery
        .create_delivery(agent, vec![collection], None)
        .await
        .unwrap();

    let paid = engine
        .delivery
        .update_delivery_status(delivery.id, None, Some(PaymentStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid.agent_payment_status, PaymentStatus::Paid);
    assert_eq!(paid.pickup_status, PickupStatus::InStore);

    // Deliberately lenient: payment may even step back.
    let back = engine
        .delivery
        .update_delivery_status(
            delivery.id,
            Some(PickupStatus::Delivered),
            Some(PaymentStatus::Processing),
        )
        .await
        .unwrap();
    assert_eq!(back.agent_payment_status, PaymentStatus::Processing);
    assert_eq!(back.pickup_status, PickupStatus::Delivered);
}
