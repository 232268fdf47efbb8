//! Shared scheduler status, read by the `/health` route.

use super::report::CycleReport;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub failed: bool,
    pub price: Option<u128>,
    pub price_relayed: bool,
    pub validators_attempted: usize,
    pub validators_relayed: usize,
    pub validators_failed: usize,
    pub interrupted: bool,
}

impl From<&CycleReport> for CycleSummary {
    fn from(report: &CycleReport) -> Self {
        Self {
            cycle: report.cycle,
            started_at: report.started_at,
            finished_at: report.finished_at,
            failed: report.is_failed(),
            price: report.price.price,
            price_relayed: report.price.outcome.is_relayed(),
            validators_attempted: report.attempted_validators(),
            validators_relayed: report.relayed_validators(),
            validators_failed: report.failed_validators(),
            interrupted: report.interrupted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub consecutive_failed_cycles: u64,
    pub last_cycle: Option<CycleSummary>,
}

#[derive(Debug, Default)]
pub struct OracleStatus {
    inner: RwLock<StatusSnapshot>,
}

impl OracleStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished cycle in. Returns the updated consecutive failure count.
    pub fn record(&self, report: &CycleReport) -> u64 {
        let summary = CycleSummary::from(report);
        let mut inner = self.inner.write();
        inner.cycles += 1;
        if summary.failed {
            inner.failed_cycles += 1;
            inner.consecutive_failed_cycles += 1;
        } else {
            inner.consecutive_failed_cycles = 0;
        }
        inner.last_cycle = Some(summary);
        inner.consecutive_failed_cycles
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().clone()
    }
}
