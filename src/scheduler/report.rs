//! Per-cycle outcome records.

use crate::error::OracleError;
use crate::models::ValidatorId;
use chrono::{DateTime, Utc};
use ethers::types::TxHash;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepError {
    pub kind: &'static str,
    pub message: String,
}

impl From<&OracleError> for StepError {
    fn from(err: &OracleError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one fetch/relay pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Relayed { tx_hash: TxHash },
    FetchFailed { error: StepError },
    RelayFailed { error: StepError },
    /// Not attempted because the price relay failed under the strict gate.
    Skipped,
}

impl StepOutcome {
    pub fn is_relayed(&self) -> bool {
        matches!(self, Self::Relayed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStep {
    /// Scaled price, when the fetch succeeded.
    pub price: Option<u128>,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorStep {
    pub validator: ValidatorId,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub price: PriceStep,
    pub validators: Vec<ValidatorStep>,
    /// Shutdown was requested before every tracked validator was attempted.
    pub interrupted: bool,
}

impl CycleReport {
    /// A cycle fails when the price cannot be fetched, or when it attempted
    /// relays and none of them landed.
    pub fn is_failed(&self) -> bool {
        if matches!(self.price.outcome, StepOutcome::FetchFailed { .. }) {
            return true;
        }
        !self.price.outcome.is_relayed() && self.relayed_validators() == 0
    }

    pub fn attempted_validators(&self) -> usize {
        self.validators
            .iter()
            .filter(|v| !matches!(v.outcome, StepOutcome::Skipped))
            .count()
    }

    pub fn relayed_validators(&self) -> usize {
        self.validators
            .iter()
            .filter(|v| v.outcome.is_relayed())
            .count()
    }

    pub fn failed_validators(&self) -> usize {
        self.attempted_validators() - self.relayed_validators()
    }

    pub fn outcome_for(&self, id: &ValidatorId) -> Option<&StepOutcome> {
        self.validators
            .iter()
            .find(|v| &v.validator == id)
            .map(|v| &v.outcome)
    }
}
