//! Ledger contract binding and call encoding.

use super::RelayKind;
use crate::error::Result;
use crate::models::ValidatorId;
use ethers::abi::AbiEncode;
use ethers::contract::abigen;
use ethers::types::{Bytes, U256};

abigen!(
    ValidatorLedger,
    r#"[
        function updatePrice(uint256 price) external
        function updateValidator(bytes32 validatorId, uint256 balance, uint256 rewards) external
    ]"#
);

/// Arguments of one contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPayload {
    Price {
        price: u128,
    },
    Validator {
        id: [u8; 32],
        balance: u128,
        rewards: u128,
    },
}

impl RelayPayload {
    pub fn price(price: u128) -> Self {
        Self::Price { price }
    }

    /// Fails with `InvalidIdentifier` if `id` does not fit in 32 bytes.
    pub fn validator(id: &ValidatorId, balance: u128, rewards: u128) -> Result<Self> {
        Ok(Self::Validator {
            id: id.to_bytes32()?,
            balance,
            rewards,
        })
    }

    pub fn kind(&self) -> RelayKind {
        match self {
            Self::Price { .. } => RelayKind::PriceUpdate,
            Self::Validator { .. } => RelayKind::ValidatorUpdate,
        }
    }

    /// ABI-encoded call data, selector included.
    pub fn calldata(&self) -> Bytes {
        let encoded = match *self {
            Self::Price { price } => UpdatePriceCall {
                price: U256::from(price),
            }
            .encode(),
            Self::Validator {
                id,
                balance,
                rewards,
            } => UpdateValidatorCall {
                validator_id: id,
                balance: U256::from(balance),
                rewards: U256::from(rewards),
            }
            .encode(),
        };
        Bytes::from(encoded)
    }
}
