//! Explicitly constructed handles shared by the scheduler and admin surface.

use crate::ledger::LedgerRelay;
use crate::provider::DataProvider;
use crate::store::TrackedSetStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct OracleContext {
    pub store: Arc<TrackedSetStore>,
    pub provider: Arc<dyn DataProvider>,
    pub relay: Arc<dyn LedgerRelay>,
}

impl OracleContext {
    pub fn new(
        store: Arc<TrackedSetStore>,
        provider: Arc<dyn DataProvider>,
        relay: Arc<dyn LedgerRelay>,
    ) -> Self {
        Self {
            store,
            provider,
            relay,
        }
    }
}
