// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sale aggregate: the seller-facing payout record for one collection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::collection::{Collection, CollectionId, LineItem};
use crate::domain::delivery::PaymentStatus;
use crate::domain::error::EngineError;
use crate::domain::repository::BankAccount;
use crate::domain::SellerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub Uuid);

impl SaleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SaleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Display fields copied from the bank account at finalization time, so a
/// later bank edit never alters a historical sale record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSnapshot {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl From<&BankAccount> for BankSnapshot {
    fn from(account: &BankAccount) -> Self {
        Self {
            bank_name: account.bank_name.clone(),
            account_number: account.account_number.clone(),
            account_name: account.account_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub seller: SellerId,
    pub collection: CollectionId,
    pub materials: Vec<LineItem>,
    pub total_quantity: Decimal,
    pub total_price: Decimal,
    pub bank_details: BankSnapshot,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Copy the collection's current line items and totals into a new sale.
    pub fn from_collection(collection: &Collection, bank: &BankAccount) -> Self {
        Self {
            id: SaleId::new(),
            seller: collection.seller,
            collection: collection.id,
            materials: collection.items().to_vec(),
            total_quantity: collection.total_quantity,
            total_price: collection.total_price,
            bank_details: BankSnapshot::from(bank),
            status: PaymentStatus::Processing,
            created_at: Utc::now(),
        }
    }

    /// Only `processing → paid` is permitted; payouts are not reversible.
    pub fn advance_status(&mut self, new_status: PaymentStatus) -> Result<(), EngineError> {
        match (self.status, new_status) {
            (PaymentStatus::Processing, PaymentStatus::Paid) => {
                self.status = PaymentStatus::Paid;
                Ok(())
            }
            (PaymentStatus::Paid, _) => Err(EngineError::conflict(
                "sale payout is already paid and cannot be changed",
            )),
            (PaymentStatus::Processing, PaymentStatus::Processing) => Err(
                EngineError::conflict("sale payout is already processing"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, BankId, MaterialId};

    fn account() -> BankAccount {
        BankAccount {
            id: BankId::new(),
            owner: SellerId::new(),
            bank_name: "First Bank".into(),
            account_number: "0123456789".into(),
            account_name: "A. Seller".into(),
        }
    }

    #[test]
    fn sale_copies_collection_totals_and_bank_fields() {
        let mut collection = Collection::new(SellerId::new());
        collection.add_material(MaterialId::new(), Decimal::from(5), Decimal::from(150));
        collection.assign(AgentId::new()).unwrap();
        collection.validate().unwrap();

        let sale = Sale::from_collection(&collection, &account());
        assert_eq!(sale.total_quantity, Decimal::from(5));
        assert_eq!(sale.total_price, Decimal::from(750));
        assert_eq!(sale.bank_details.bank_name, "First Bank");
        assert_eq!(sale.status, PaymentStatus::Processing);
    }

    #[test]
    fn paid_status_cannot_be_walked_back() {
        let mut collection = Collection::new(SellerId::new());
        collection.add_material(MaterialId::new(), Decimal::from(1), Decimal::from(10));
        let mut sale = Sale::from_collection(&collection, &account());

        sale.advance_status(PaymentStatus::Paid).unwrap();
        assert!(matches!(
            sale.advance_status(PaymentStatus::Processing),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            sale.advance_status(PaymentStatus::Paid),
            Err(EngineError::Conflict(_))
        ));
    }
}
