//! Oracle Scheduler
//!
//! One cycle: fetch and relay the price, snapshot the tracked set, then fetch
//! and relay each validator in turn. Failures are recorded per step and never
//! abort the cycle. Cycles never overlap; the interval is measured from the end
//! of the previous cycle.

pub mod report;
pub mod status;

use crate::context::OracleContext;
use crate::error::OracleError;
use crate::ledger::Confirmation;
use crate::models::ValidatorId;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use report::{CycleReport, PriceStep, StepError, StepOutcome, ValidatorStep};
pub use status::{CycleSummary, OracleStatus, StatusSnapshot};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub interval: Duration,
    /// Skip the validator pass when the price relay fails.
    pub strict_price_gate: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            strict_price_gate: false,
        }
    }
}

pub struct Scheduler {
    ctx: OracleContext,
    settings: SchedulerSettings,
    status: Arc<OracleStatus>,
    shutdown: watch::Receiver<bool>,
    cycle: u64,
}

impl Scheduler {
    pub fn new(
        ctx: OracleContext,
        settings: SchedulerSettings,
        status: Arc<OracleStatus>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ctx,
            settings,
            status,
            shutdown,
            cycle: 0,
        }
    }

    /// Run cycles until shutdown is signalled (or the signal sender is dropped).
    pub async fn run(mut self) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            strict_price_gate = self.settings.strict_price_gate,
            "oracle scheduler started"
        );

        while !self.shutdown_requested() {
            let report = self.run_cycle().await;
            if report.interrupted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = self.stop_signalled() => break,
            }
        }

        info!(cycles = self.cycle, "oracle scheduler stopped");
    }

    /// Resolves once the flag is set to `true` or the sender is gone.
    async fn stop_signalled(&mut self) {
        let _ = self.shutdown.wait_for(|stop| *stop).await;
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            price: PriceStep {
                price: None,
                outcome: StepOutcome::Skipped,
            },
            validators: Vec::new(),
            interrupted: false,
        };
        info!(cycle = self.cycle, "oracle cycle started");

        let price = match self.ctx.provider.fetch_price().await {
            Ok(price) => price,
            Err(e) => {
                error!(
                    cycle = self.cycle,
                    kind = e.kind(),
                    error = %e,
                    "price fetch failed; skipping validator pass"
                );
                report.price.outcome = StepOutcome::FetchFailed {
                    error: StepError::from(&e),
                };
                return self.finish(report);
            }
        };
        report.price.price = Some(price.scaled);

        let relayed = self
            .ctx
            .relay
            .submit_price_update(price.scaled)
            .await
            .and_then(Confirmation::ensure_success);
        report.price.outcome = match relayed {
            Ok(confirmation) => {
                info!(
                    price = %price.scaled,
                    raw = price.raw,
                    tx_hash = ?confirmation.tx_hash,
                    "price relayed"
                );
                StepOutcome::Relayed {
                    tx_hash: confirmation.tx_hash,
                }
            }
            Err(e) => {
                warn!(
                    price = %price.scaled,
                    kind = e.kind(),
                    error = %e,
                    "price relay failed"
                );
                StepOutcome::RelayFailed {
                    error: StepError::from(&e),
                }
            }
        };

        let tracked = self.ctx.store.list();

        if self.settings.strict_price_gate && !report.price.outcome.is_relayed() {
            warn!(
                validators = tracked.len(),
                "strict price gate: skipping validator pass"
            );
            report.validators = tracked
                .iter()
                .map(|id| ValidatorStep {
                    validator: id.clone(),
                    outcome: StepOutcome::Skipped,
                })
                .collect();
            return self.finish(report);
        }

        for id in tracked.iter() {
            if self.shutdown_requested() {
                report.interrupted = true;
                break;
            }
            let outcome = self.process_validator(id).await;
            report.validators.push(ValidatorStep {
                validator: id.clone(),
                outcome,
            });
        }

        self.finish(report)
    }

    /// Fetch then relay one validator. The pair always runs to completion.
    async fn process_validator(&self, id: &ValidatorId) -> StepOutcome {
        let obs = match self.ctx.provider.fetch_validator(id).await {
            Ok(obs) => obs,
            Err(e) => {
                log_step_failure(id, "validator fetch failed", &e);
                return StepOutcome::FetchFailed {
                    error: StepError::from(&e),
                };
            }
        };

        let relayed = self
            .ctx
            .relay
            .submit_validator_update(id, obs.balance, obs.rewards)
            .await
            .and_then(Confirmation::ensure_success);
        match relayed {
            Ok(confirmation) => {
                info!(
                    validator = %id,
                    balance = %obs.balance,
                    rewards = %obs.rewards,
                    tx_hash = ?confirmation.tx_hash,
                    "validator relayed"
                );
                StepOutcome::Relayed {
                    tx_hash: confirmation.tx_hash,
                }
            }
            Err(e) => {
                log_step_failure(id, "validator relay failed", &e);
                StepOutcome::RelayFailed {
                    error: StepError::from(&e),
                }
            }
        }
    }

    fn finish(&self, mut report: CycleReport) -> CycleReport {
        report.finished_at = Utc::now();
        let consecutive = self.status.record(&report);
        let elapsed_ms = (report.finished_at - report.started_at).num_milliseconds();

        if report.is_failed() {
            error!(
                cycle = report.cycle,
                consecutive_failed_cycles = consecutive,
                elapsed_ms,
                "oracle cycle failed"
            );
        } else {
            info!(
                cycle = report.cycle,
                price_relayed = report.price.outcome.is_relayed(),
                validators_relayed = report.relayed_validators(),
                validators_failed = report.failed_validators(),
                interrupted = report.interrupted,
                elapsed_ms,
                "oracle cycle finished"
            );
        }
        report
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

fn log_step_failure(id: &ValidatorId, msg: &str, e: &OracleError) {
    warn!(validator = %id, kind = e.kind(), error = %e, "{}", msg);
}
