//! `ethers`-backed relay: legacy transactions signed locally and sent raw.

use super::{
    Confirmation, LedgerRelay, RelayPayload, RelayTransaction, SignedRelayTransaction, TxStatus,
};
use crate::error::{OracleError, Result};
use crate::models::ValidatorId;
use ethers::prelude::*;
use ethers::providers::RpcError;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::keccak256;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub rpc_url: String,
    pub contract: Address,
    pub gas_limit: u64,
    /// Queried from the node on first use when unset.
    pub chain_id: Option<u64>,
    pub request_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_poll: Duration,
}

pub struct EthersRelay {
    provider: Provider<Http>,
    wallet: LocalWallet,
    settings: RelaySettings,
    chain_id: OnceCell<u64>,
}

impl EthersRelay {
    /// Build the relay and sanity-check the contract address.
    ///
    /// An address with no deployed code is a configuration error. An
    /// unreachable node is only logged; the scheduler retries every cycle.
    pub async fn connect(settings: RelaySettings, wallet: LocalWallet) -> Result<Self> {
        let url = reqwest::Url::parse(&settings.rpc_url)
            .map_err(|e| OracleError::Configuration(format!("invalid RPC_URL: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| OracleError::Configuration(format!("failed to build RPC client: {e}")))?;
        let provider =
            Provider::new(Http::new_with_client(url, client)).interval(settings.confirmation_poll);

        let chain_id = match settings.chain_id {
            Some(id) => OnceCell::new_with(Some(id)),
            None => OnceCell::new(),
        };

        let relay = Self {
            provider,
            wallet,
            settings,
            chain_id,
        };
        relay.check_contract().await?;

        info!(
            relayer = ?relay.wallet.address(),
            contract = ?relay.settings.contract,
            "ledger relay ready"
        );
        Ok(relay)
    }

    pub fn relayer(&self) -> Address {
        self.wallet.address()
    }

    async fn check_contract(&self) -> Result<()> {
        let contract = self.settings.contract;
        match self
            .bounded("eth_getCode", self.provider.get_code(contract, None))
            .await
        {
            Ok(code) if code.is_empty() => Err(OracleError::Configuration(format!(
                "no contract deployed at {contract:?}"
            ))),
            Ok(code) => {
                debug!(contract = ?contract, bytes = code.len(), "contract code present");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "ledger node unreachable at startup; continuing");
                Ok(())
            }
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self
                    .bounded("eth_chainId", self.provider.get_chainid())
                    .await?;
                Ok::<u64, OracleError>(id.as_u64())
            })
            .await
            .copied()
    }

    /// Reads the nonce and gas price fresh for every transaction.
    ///
    /// The nonce comes from the pending block so a submitted transaction that
    /// never confirmed still holds its slot.
    async fn build(&self, payload: RelayPayload) -> Result<RelayTransaction> {
        let chain_id = self.chain_id().await?;
        let nonce = self
            .bounded(
                "eth_getTransactionCount",
                self.provider.get_transaction_count(
                    self.wallet.address(),
                    Some(BlockNumber::Pending.into()),
                ),
            )
            .await?;
        let gas_price = self
            .bounded("eth_gasPrice", self.provider.get_gas_price())
            .await?;

        Ok(RelayTransaction {
            payload,
            nonce,
            gas_limit: U256::from(self.settings.gas_limit),
            gas_price,
            chain_id,
        })
    }

    fn to_typed(&self, tx: &RelayTransaction) -> TypedTransaction {
        TransactionRequest::new()
            .from(self.wallet.address())
            .to(self.settings.contract)
            .data(tx.payload.calldata())
            .nonce(tx.nonce)
            .gas(tx.gas_limit)
            .gas_price(tx.gas_price)
            .chain_id(tx.chain_id)
            .into()
    }

    async fn sign(&self, tx: RelayTransaction) -> Result<SignedRelayTransaction> {
        let typed = self.to_typed(&tx);
        let signature = self
            .wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| OracleError::RelayRejected(format!("signing failed: {e}")))?;
        let raw = typed.rlp_signed(&signature);
        let tx_hash = TxHash::from(keccak256(&raw));

        Ok(SignedRelayTransaction {
            tx,
            signature,
            raw,
            tx_hash,
        })
    }

    async fn submit(&self, signed: SignedRelayTransaction) -> Result<Confirmation> {
        let kind = signed.kind();
        let pending = self
            .bounded(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(signed.raw.clone()),
            )
            .await?;
        let tx_hash = pending.tx_hash();
        if tx_hash != signed.tx_hash {
            warn!(local = ?signed.tx_hash, node = ?tx_hash, "node reported a different tx hash");
        }
        info!(
            kind = %kind,
            tx_hash = ?tx_hash,
            nonce = %signed.tx.nonce,
            gas_price = %signed.tx.gas_price,
            "transaction submitted"
        );

        let waited = tokio::time::timeout(
            self.settings.confirmation_timeout,
            pending
                .interval(self.settings.confirmation_poll)
                .confirmations(1),
        )
        .await;

        let receipt = match waited {
            Err(_) => {
                return Err(OracleError::RelayUnavailable(format!(
                    "no receipt for {tx_hash:?} within {:?}",
                    self.settings.confirmation_timeout
                )))
            }
            Ok(Err(e)) => return Err(classify("confirmation", &e)),
            Ok(Ok(None)) => {
                return Err(OracleError::RelayRejected(format!(
                    "{tx_hash:?} dropped from mempool"
                )))
            }
            Ok(Ok(Some(receipt))) => receipt,
        };

        let status = if receipt.status == Some(U64::from(1)) {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        };

        let confirmation = Confirmation {
            kind,
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used,
            status,
        };
        info!(
            kind = %kind,
            tx_hash = ?confirmation.tx_hash,
            block = ?confirmation.block_number,
            status = ?confirmation.status,
            "transaction confirmed"
        );
        confirmation.ensure_success()
    }

    async fn relay(&self, payload: RelayPayload) -> Result<Confirmation> {
        let tx = self.build(payload).await?;
        let signed = self.sign(tx).await?;
        self.submit(signed).await
    }

    async fn bounded<T, F>(&self, call: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.settings.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(call, &e)),
            Err(_) => Err(OracleError::RelayUnavailable(format!("{call} timed out"))),
        }
    }
}

#[async_trait::async_trait]
impl LedgerRelay for EthersRelay {
    async fn submit_price_update(&self, price: u128) -> Result<Confirmation> {
        self.relay(RelayPayload::price(price)).await
    }

    async fn submit_validator_update(
        &self,
        id: &ValidatorId,
        balance: u128,
        rewards: u128,
    ) -> Result<Confirmation> {
        let payload = RelayPayload::validator(id, balance, rewards)?;
        self.relay(payload).await
    }
}

/// Node-side JSON-RPC errors are rejections; everything else is connectivity.
fn classify(call: &str, err: &ProviderError) -> OracleError {
    match RpcError::as_error_response(err) {
        Some(rpc) => OracleError::RelayRejected(format!("{call}: {}", rpc.message)),
        None => OracleError::RelayUnavailable(format!("{call}: {err}")),
    }
}
