use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::error::EngineError;
use crate::domain::fee::{default_fee_per_kg, FeeEntry};
use crate::domain::repository::FeeRepository;
use crate::domain::AdminId;
use crate::infrastructure::retry::with_read_retry;

#[async_trait]
pub trait FeeService: Send + Sync {
    /// The fee in effect now. Falls back to the documented default on an
    /// empty registry; never fails for lack of entries.
    async fn current_fee(&self) -> Result<Decimal, EngineError>;

    /// Close the active entry and activate a new one.
    async fn set_fee(&self, fee_per_kg: Decimal, set_by: AdminId) -> Result<FeeEntry, EngineError>;

    async fn fee_history(&self) -> Result<Vec<FeeEntry>, EngineError>;
}

pub struct StandardFeeService {
    registry: Arc<dyn FeeRepository>,
}

impl StandardFeeService {
    pub fn new(registry: Arc<dyn FeeRepository>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl FeeService for StandardFeeService {
    async fn current_fee(&self) -> Result<Decimal, EngineError> {
        let current = with_read_retry("fee_registry.current", || self.registry.current()).await?;
        Ok(current
            .map(|entry| entry.fee_per_kg)
            .unwrap_or_else(default_fee_per_kg))
    }

    async fn set_fee(&self, fee_per_kg: Decimal, set_by: AdminId) -> Result<FeeEntry, EngineError> {
        if fee_per_kg < Decimal::ZERO {
            return Err(EngineError::validation("fee per kg cannot be negative"));
        }
        let entry = FeeEntry::new(fee_per_kg, set_by);
        Ok(self.registry.supersede(entry).await?)
    }

    async fn fee_history(&self) -> Result<Vec<FeeEntry>, EngineError> {
        Ok(with_read_retry("fee_registry.history", || self.registry.history()).await?)
    }
}
