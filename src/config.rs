//! Process configuration.
//!
//! Every option is a CLI flag with an environment fallback; `main` loads a
//! `.env` file first. Anything missing or unparseable is a startup-fatal
//! `OracleError::Configuration`.

use crate::error::{OracleError, Result};
use crate::ledger::RelaySettings;
use crate::provider::ProviderEndpoints;
use crate::scheduler::SchedulerSettings;
use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Largest supported price scale.
pub const MAX_PRICE_DECIMALS: u32 = 18;

#[derive(Parser, Debug, Clone)]
#[command(name = "validator-oracle")]
#[command(about = "Relays validator balances, rewards and an asset price to a ledger contract")]
pub struct OracleConfig {
    /// Ledger network JSON-RPC endpoint
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Hex signing key of the relaying account
    #[arg(long, env = "PRIVATE_KEY", value_parser = parse_secret, hide_env_values = true)]
    pub private_key: Secret,

    /// Ledger contract address
    #[arg(long, env = "CONTRACT_ADDRESS", value_parser = parse_contract_address)]
    pub contract_address: Address,

    /// Data-provider base URL for validator reads
    #[arg(long, env = "API_URL")]
    pub api_url: String,

    /// Bearer credential for the data provider
    #[arg(long, env = "API_KEY", value_parser = parse_secret, hide_env_values = true)]
    pub api_key: Secret,

    #[arg(long, env = "ADMIN_PORT")]
    pub admin_port: u16,

    #[arg(long, env = "ADMIN_HOST", default_value = "0.0.0.0")]
    pub admin_host: String,

    /// Unauthenticated price source (`/simple/price` style)
    #[arg(long, env = "PRICE_API_URL", default_value = "https://api.coingecko.com/api/v3")]
    pub price_api_url: String,

    #[arg(long, env = "PRICE_ASSET", default_value = "ethereum")]
    pub price_asset: String,

    #[arg(long, env = "PRICE_CURRENCY", default_value = "usd")]
    pub price_currency: String,

    /// Fixed-point scale of the relayed price
    #[arg(long, env = "PRICE_DECIMALS", default_value = "8")]
    pub price_decimals: u32,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "60")]
    pub poll_interval_secs: u64,

    #[arg(long, env = "GAS_LIMIT", default_value = "200000")]
    pub gas_limit: u64,

    /// Queried from the node when unset
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    #[arg(long, env = "TRACKED_SET_PATH", default_value = "tracked_validators.txt")]
    pub tracked_set_path: PathBuf,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "180")]
    pub confirmation_timeout_secs: u64,

    #[arg(long, env = "CONFIRMATION_POLL_MS", default_value = "2000")]
    pub confirmation_poll_ms: u64,

    /// Skip validator relays in a cycle whose price relay failed
    #[arg(
        long,
        env = "STRICT_PRICE_GATE",
        default_value = "false",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub strict_price_gate: bool,
}

impl OracleConfig {
    /// Parse from the process arguments and environment.
    pub fn load() -> Result<Self> {
        let config = Self::try_parse().map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => OracleError::Configuration(e.to_string()),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config =
            Self::try_parse_from(args).map_err(|e| OracleError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.signing_key()?;

        for (name, url) in [
            ("RPC_URL", &self.rpc_url),
            ("API_URL", &self.api_url),
            ("PRICE_API_URL", &self.price_api_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| OracleError::Configuration(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.api_key.expose().trim().is_empty() {
            return Err(OracleError::Configuration("API_KEY is empty".into()));
        }
        if self.admin_port == 0 {
            return Err(OracleError::Configuration("ADMIN_PORT must be non-zero".into()));
        }
        if self.price_decimals > MAX_PRICE_DECIMALS {
            return Err(OracleError::Configuration(format!(
                "PRICE_DECIMALS must be at most {MAX_PRICE_DECIMALS}"
            )));
        }
        for (name, value) in [
            ("POLL_INTERVAL_SECS", self.poll_interval_secs),
            ("GAS_LIMIT", self.gas_limit),
            ("HTTP_TIMEOUT_SECS", self.http_timeout_secs),
            ("CONFIRMATION_TIMEOUT_SECS", self.confirmation_timeout_secs),
            ("CONFIRMATION_POLL_MS", self.confirmation_poll_ms),
        ] {
            if value == 0 {
                return Err(OracleError::Configuration(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    /// Parsed relayer key. Parse errors never echo the input.
    pub fn signing_key(&self) -> Result<SigningKey> {
        let raw = self.private_key.expose().trim();
        let hex_key = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        hex_key.parse::<LocalWallet>().map(SigningKey).map_err(|_| {
            OracleError::Configuration("PRIVATE_KEY is not a valid hex secp256k1 key".into())
        })
    }

    pub fn admin_addr(&self) -> String {
        format!("{}:{}", self.admin_host, self.admin_port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn provider_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            validator_base_url: self.api_url.clone(),
            price_base_url: self.price_api_url.clone(),
            price_asset: self.price_asset.clone(),
            price_currency: self.price_currency.clone(),
            price_decimals: self.price_decimals,
            timeout: self.http_timeout(),
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            rpc_url: self.rpc_url.clone(),
            contract: self.contract_address,
            gas_limit: self.gas_limit,
            chain_id: self.chain_id,
            request_timeout: self.http_timeout(),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            confirmation_poll: Duration::from_millis(self.confirmation_poll_ms),
        }
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            strict_price_gate: self.strict_price_gate,
        }
    }
}

/// Relayer signing key. `Debug` shows only the derived address.
#[derive(Clone)]
pub struct SigningKey(LocalWallet);

impl SigningKey {
    pub fn wallet(&self) -> LocalWallet {
        self.0.clone()
    }

    pub fn address(&self) -> Address {
        self.0.address()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({:?})", self.0.address())
    }
}

/// String credential that never prints.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

fn parse_contract_address(raw: &str) -> std::result::Result<Address, String> {
    let address = raw
        .trim()
        .parse::<Address>()
        .map_err(|e| format!("not a valid address: {e}"))?;
    if address.is_zero() {
        return Err("contract address must be non-zero".into());
    }
    Ok(address)
}

fn parse_secret(raw: &str) -> std::result::Result<Secret, String> {
    Ok(Secret(raw.to_string()))
}
