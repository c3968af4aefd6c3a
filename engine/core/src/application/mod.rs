// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod collection_service;
pub mod delivery_service;
pub mod fee_service;
pub mod sale_service;
pub mod validation_service;

// Re-export services for convenience
pub use collection_service::{CollectionService, StandardCollectionService};
pub use delivery_service::{
    DeliveryService, ProfitLine, ProfitPreview, StandardDeliveryService,
};
pub use fee_service::{FeeService, StandardFeeService};
pub use sale_service::{SaleService, StandardSaleService};
pub use validation_service::{FinalLineItem, StandardValidationService, ValidationService};
