//! Error taxonomy for the oracle.
//!
//! Only `Configuration` is fatal. Every other variant is scoped to a single
//! fetch, relay or store call and is handled by the caller.

use ethers::types::TxHash;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data provider rejected credentials (HTTP {status})")]
    ProviderAuthFailed { status: u16 },

    #[error("data provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("data provider returned malformed data: {0}")]
    ProviderMalformed(String),

    #[error("invalid validator identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("ledger unavailable: {0}")]
    RelayUnavailable(String),

    #[error("transaction rejected: {0}")]
    RelayRejected(String),

    #[error("transaction {tx_hash:?} reverted")]
    RelayReverted { tx_hash: TxHash },

    #[error("tracked-set storage error at {}: {source}", path.display())]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = OracleError> = std::result::Result<T, E>;

impl OracleError {
    pub fn invalid_identifier(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreIo {
            path: path.into(),
            source,
        }
    }

    /// Stable label for logs and the status endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ProviderAuthFailed { .. } => "provider_auth_failed",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::ProviderMalformed(_) => "provider_malformed",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::RelayUnavailable(_) => "relay_unavailable",
            Self::RelayRejected(_) => "relay_rejected",
            Self::RelayReverted { .. } => "relay_reverted",
            Self::StoreIo { .. } => "store_io",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_is_fatal() {
        assert!(OracleError::Configuration("missing RPC_URL".into()).is_fatal());
        assert!(!OracleError::ProviderUnavailable("timeout".into()).is_fatal());
        assert!(!OracleError::RelayRejected("nonce too low".into()).is_fatal());
    }

    #[test]
    fn kind_labels_are_distinct_for_provider_failures() {
        let auth = OracleError::ProviderAuthFailed { status: 401 };
        let down = OracleError::ProviderUnavailable("503".into());
        let bad = OracleError::ProviderMalformed("no balance".into());
        assert_eq!(auth.kind(), "provider_auth_failed");
        assert_eq!(down.kind(), "provider_unavailable");
        assert_eq!(bad.kind(), "provider_malformed");
    }

    #[test]
    fn store_io_message_names_the_path() {
        let err = OracleError::store_io(
            "/var/lib/oracle/tracked.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/var/lib/oracle/tracked.txt"));
        assert!(msg.contains("denied"));
    }
}
