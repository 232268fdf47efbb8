//! Ledger Relay Client
//!
//! Builds, signs, submits and confirms state-update transactions against the
//! ledger contract. Exactly one submitter per signing key is assumed; the
//! scheduler relays strictly sequentially, so the pending nonce read
//! immediately before each build is never contended.

pub mod contract;
pub mod ethers_relay;

use crate::error::{OracleError, Result};
use crate::models::ValidatorId;
use ethers::types::{Bytes, Signature, TxHash, U256};
use serde::Serialize;
use std::fmt;

pub use contract::RelayPayload;
pub use ethers_relay::{EthersRelay, RelaySettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayKind {
    PriceUpdate,
    ValidatorUpdate,
}

impl fmt::Display for RelayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceUpdate => write!(f, "price_update"),
            Self::ValidatorUpdate => write!(f, "validator_update"),
        }
    }
}

/// An unsigned transaction ready to be signed.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayTransaction {
    pub payload: RelayPayload,
    pub nonce: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub chain_id: u64,
}

impl RelayTransaction {
    pub fn kind(&self) -> RelayKind {
        self.payload.kind()
    }
}

/// A transaction signed by the relayer key, in the exact bytes sent to the node.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRelayTransaction {
    pub tx: RelayTransaction,
    pub signature: Signature,
    pub raw: Bytes,
    /// keccak256 of `raw`.
    pub tx_hash: TxHash,
}

impl SignedRelayTransaction {
    pub fn kind(&self) -> RelayKind {
        self.tx.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Inclusion receipt for a relayed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub kind: RelayKind,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub status: TxStatus,
}

impl Confirmation {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Turns a reverted confirmation into `RelayReverted`.
    pub fn ensure_success(self) -> Result<Self> {
        match self.status {
            TxStatus::Success => Ok(self),
            TxStatus::Reverted => Err(OracleError::RelayReverted {
                tx_hash: self.tx_hash,
            }),
        }
    }
}

#[async_trait::async_trait]
pub trait LedgerRelay: Send + Sync {
    /// Relay the global asset price (fixed point).
    async fn submit_price_update(&self, price: u128) -> Result<Confirmation>;

    /// Relay one validator's balance and rewards.
    async fn submit_validator_update(
        &self,
        id: &ValidatorId,
        balance: u128,
        rewards: u128,
    ) -> Result<Confirmation>;
}
