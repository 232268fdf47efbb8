//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{TxHash, U256};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use validator_oracle::{
    ledger::{Confirmation, LedgerRelay, RelayKind, TxStatus},
    models::{Observation, PriceRecord, ValidatorId},
    provider::DataProvider,
    scheduler::{OracleStatus, Scheduler, SchedulerSettings},
    store::TrackedSetStore,
    OracleContext, OracleError, Result,
};

pub const A: &str = "0xaaaa000000000000000000000000000000000000000000000000000000000001";
pub const B: &str = "0xbbbb000000000000000000000000000000000000000000000000000000000002";
pub const C: &str = "0xcccc000000000000000000000000000000000000000000000000000000000003";

pub fn vid(raw: &str) -> ValidatorId {
    ValidatorId::parse(raw).unwrap()
}

// ===== Data provider =====

#[derive(Default)]
pub struct MockProvider {
    price: Mutex<Option<u128>>,
    validators: Mutex<HashMap<ValidatorId, (u128, u128)>>,
    failing: Mutex<HashSet<ValidatorId>>,
    pub price_calls: AtomicU64,
    pub validator_calls: Mutex<Vec<ValidatorId>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_price(&self, scaled: u128) {
        *self.price.lock() = Some(scaled);
    }

    pub fn fail_price(&self) {
        *self.price.lock() = None;
    }

    pub fn set_validator(&self, raw: &str, balance: u128, rewards: u128) {
        self.validators.lock().insert(vid(raw), (balance, rewards));
    }

    pub fn fail_validator(&self, raw: &str) {
        self.failing.lock().insert(vid(raw));
    }

    pub fn price_calls(&self) -> u64 {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn fetch_validator(&self, id: &ValidatorId) -> Result<Observation> {
        self.validator_calls.lock().push(id.clone());
        if self.failing.lock().contains(id) {
            return Err(OracleError::ProviderUnavailable("mock: HTTP 503".into()));
        }
        let (balance, rewards) = self
            .validators
            .lock()
            .get(id)
            .copied()
            .ok_or_else(|| OracleError::ProviderMalformed("mock: no data".into()))?;
        Ok(Observation {
            validator: id.clone(),
            balance,
            rewards,
        })
    }

    async fn fetch_price(&self) -> Result<PriceRecord> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let scaled = (*self.price.lock())
            .ok_or_else(|| OracleError::ProviderUnavailable("mock: price down".into()))?;
        Ok(PriceRecord {
            scaled,
            decimals: 8,
            raw: scaled as f64 / 1e8,
        })
    }
}

// ===== Ledger relay =====

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelayCall {
    Price(u128),
    Validator(ValidatorId, u128, u128),
}

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MockRelay {
    pub calls: Mutex<Vec<RelayCall>>,
    fail_price: AtomicBool,
    failing: Mutex<HashSet<ValidatorId>>,
    reverting: Mutex<HashSet<ValidatorId>>,
    on_validator: Mutex<Option<Hook>>,
    next_hash: AtomicU64,
}

impl MockRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_price(&self) {
        self.fail_price.store(true, Ordering::SeqCst);
    }

    pub fn fail_validator(&self, raw: &str) {
        self.failing.lock().insert(vid(raw));
    }

    pub fn revert_validator(&self, raw: &str) {
        self.reverting.lock().insert(vid(raw));
    }

    /// Runs inside every validator submission, before it returns.
    pub fn on_validator(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_validator.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().clone()
    }

    pub fn price_calls(&self) -> Vec<u128> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RelayCall::Price(p) => Some(p),
                RelayCall::Validator(..) => None,
            })
            .collect()
    }

    pub fn validator_calls(&self) -> HashSet<RelayCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RelayCall::Validator(..)))
            .collect()
    }

    fn confirmation(&self, kind: RelayKind, status: TxStatus) -> Confirmation {
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst) + 1;
        Confirmation {
            kind,
            tx_hash: TxHash::from_low_u64_be(n),
            block_number: Some(1_000 + n),
            gas_used: Some(U256::from(50_000u64)),
            status,
        }
    }
}

#[async_trait]
impl LedgerRelay for MockRelay {
    async fn submit_price_update(&self, price: u128) -> Result<Confirmation> {
        self.calls.lock().push(RelayCall::Price(price));
        if self.fail_price.load(Ordering::SeqCst) {
            return Err(OracleError::RelayRejected("mock: nonce too low".into()));
        }
        Ok(self.confirmation(RelayKind::PriceUpdate, TxStatus::Success))
    }

    async fn submit_validator_update(
        &self,
        id: &ValidatorId,
        balance: u128,
        rewards: u128,
    ) -> Result<Confirmation> {
        self.calls
            .lock()
            .push(RelayCall::Validator(id.clone(), balance, rewards));
        if let Some(hook) = self.on_validator.lock().as_ref() {
            hook();
        }
        if self.failing.lock().contains(id) {
            return Err(OracleError::RelayUnavailable("mock: connection reset".into()));
        }
        let status = if self.reverting.lock().contains(id) {
            TxStatus::Reverted
        } else {
            TxStatus::Success
        };
        Ok(self.confirmation(RelayKind::ValidatorUpdate, status))
    }
}

// ===== Scheduler harness =====

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<TrackedSetStore>,
    pub provider: Arc<MockProvider>,
    pub relay: Arc<MockRelay>,
    pub status: Arc<OracleStatus>,
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(TrackedSetStore::open(dir.path().join("tracked_validators.txt")).unwrap());
        let (shutdown, _) = watch::channel(false);
        Self {
            dir,
            store,
            provider: MockProvider::new(),
            relay: MockRelay::new(),
            status: Arc::new(OracleStatus::new()),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn track(&self, raw: &str) {
        self.store.add(raw).unwrap();
    }

    pub fn scheduler(&self, settings: SchedulerSettings) -> Scheduler {
        let ctx = OracleContext::new(
            self.store.clone(),
            self.provider.clone(),
            self.relay.clone(),
        );
        Scheduler::new(
            ctx,
            settings,
            self.status.clone(),
            self.shutdown.subscribe(),
        )
    }

    pub fn default_scheduler(&self) -> Scheduler {
        self.scheduler(SchedulerSettings::default())
    }

    pub fn fast_scheduler(&self, interval: Duration) -> Scheduler {
        self.scheduler(SchedulerSettings {
            interval,
            strict_price_gate: false,
        })
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
