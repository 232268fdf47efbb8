//! Data Provider Client
//!
//! Reads validator balances/rewards and the asset's fiat price from remote
//! read-only sources. No retries happen here; the scheduler owns retry policy.

pub mod http;

use crate::error::Result;
use crate::models::{Observation, PriceRecord, ValidatorId};

pub use http::{HttpDataProvider, ProviderEndpoints};

#[async_trait::async_trait]
pub trait DataProvider: Send + Sync {
    /// Authenticated read of one validator's balance and rewards.
    async fn fetch_validator(&self, id: &ValidatorId) -> Result<Observation>;

    /// Unauthenticated read of the tracked asset's fiat price.
    async fn fetch_price(&self) -> Result<PriceRecord>;
}
