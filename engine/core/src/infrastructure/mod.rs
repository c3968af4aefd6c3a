// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod repositories;
pub mod retry;

pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use repositories::{
    InMemoryAgentDirectory, InMemoryBankDirectory, InMemoryCollectionRepository,
    InMemoryDeliveryRepository, InMemoryFeeRegistry, InMemoryMaterialCatalog,
    InMemorySaleRepository,
};
