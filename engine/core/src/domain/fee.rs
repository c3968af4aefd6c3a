// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Versioned per-kilogram agent fee.
//!
//! The fee is a mutable global parameter, but historical deliveries must
//! stay reproducible, so it is modelled as an append-only registry: setting
//! a new fee closes the previous entry instead of overwriting it. At most
//! one entry is active and open (`effective_to == None`) at any time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::AdminId;

/// Fee applied when the registry has no entries yet.
pub fn default_fee_per_kg() -> Decimal {
    Decimal::from(20)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeEntryId(pub Uuid);

impl FeeEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeeEntryId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEntry {
    pub id: FeeEntryId,
    pub fee_per_kg: Decimal,
    pub is_active: bool,
    pub set_by: AdminId,
    pub effective_from: DateTime<Utc>,
    /// `None` marks the current entry; superseded entries carry the instant
    /// they were closed.
    pub effective_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FeeEntry {
    pub fn new(fee_per_kg: Decimal, set_by: AdminId) -> Self {
        let now = Utc::now();
        Self {
            id: FeeEntryId::new(),
            fee_per_kg,
            is_active: true,
            set_by,
            effective_from: now,
            effective_to: None,
            created_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_active && self.effective_to.is_none()
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.effective_to = Some(at);
    }
}
