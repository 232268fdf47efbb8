//! Validator Oracle Library
//!
//! Periodically reads validator balances, rewards and an asset price from a
//! remote data provider and relays them to a ledger contract. The binary wires
//! these modules together; tests drive them directly.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod scheduler;
pub mod store;

pub use context::OracleContext;
pub use error::{OracleError, Result};
