//! HTTP data provider.
//!
//! Validator reads go to a bearer-authenticated REST API
//! (`GET {base}/validator/{id}`); the price comes from an unauthenticated
//! `simple/price` style endpoint.

use super::DataProvider;
use crate::error::{OracleError, Result};
use crate::models::{Observation, PriceRecord, ValidatorId};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub validator_base_url: String,
    pub price_base_url: String,
    pub price_asset: String,
    pub price_currency: String,
    pub price_decimals: u32,
    /// Bound on every request, connect through body.
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct HttpDataProvider {
    authed: Client,
    public: Client,
    endpoints: ProviderEndpoints,
}

impl HttpDataProvider {
    pub fn new(endpoints: ProviderEndpoints, api_key: &str) -> Result<Self> {
        let auth_value: reqwest::header::HeaderValue = format!("Bearer {}", api_key)
            .parse()
            .map_err(|_| OracleError::Configuration("API_KEY is not a valid header value".into()))?;

        let authed = Client::builder()
            .timeout(endpoints.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(reqwest::header::AUTHORIZATION, auth_value);
                headers
            })
            .build()
            .map_err(|e| OracleError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let public = Client::builder()
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| OracleError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            authed,
            public,
            endpoints,
        })
    }

    fn validator_url(&self, id: &ValidatorId) -> String {
        endpoint_url(
            &self.endpoints.validator_base_url,
            &format!("/validator/{id}"),
        )
    }

    fn price_url(&self) -> String {
        endpoint_url(&self.endpoints.price_base_url, "/simple/price")
    }
}

#[async_trait::async_trait]
impl DataProvider for HttpDataProvider {
    async fn fetch_validator(&self, id: &ValidatorId) -> Result<Observation> {
        let url = self.validator_url(id);
        let resp = self
            .authed
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error("validator request", e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error("validator response", e))?;
        if !status.is_success() {
            return Err(status_error("validator request", status, &body));
        }

        let obs = parse_validator_body(id, &body)?;
        debug!(
            validator = %id,
            balance = %obs.balance,
            rewards = %obs.rewards,
            "validator observation fetched"
        );
        Ok(obs)
    }

    async fn fetch_price(&self) -> Result<PriceRecord> {
        let ep = &self.endpoints;
        let resp = self
            .public
            .get(self.price_url())
            .query(&[
                ("ids", ep.price_asset.as_str()),
                ("vs_currencies", ep.price_currency.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error("price request", e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error("price response", e))?;
        if !status.is_success() {
            return Err(status_error("price request", status, &body));
        }

        let raw = parse_price_body(&body, &ep.price_asset, &ep.price_currency)?;
        let price = PriceRecord::from_float(raw, ep.price_decimals)?;
        debug!(raw = price.raw, scaled = %price.scaled, "price fetched");
        Ok(price)
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn transport_error(what: &str, e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::ProviderUnavailable(format!("{what} timed out"))
    } else {
        OracleError::ProviderUnavailable(format!("{what} failed: {e}"))
    }
}

fn status_error(what: &str, status: StatusCode, body: &str) -> OracleError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OracleError::ProviderAuthFailed {
            status: status.as_u16(),
        },
        _ => {
            let snippet: String = body.chars().take(200).collect();
            OracleError::ProviderUnavailable(format!("{what} returned HTTP {status}: {snippet}"))
        }
    }
}

/// `data` may be a single object or a non-empty array (first element wins).
pub(crate) fn parse_validator_body(id: &ValidatorId, body: &str) -> Result<Observation> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| OracleError::ProviderMalformed(format!("validator body is not JSON: {e}")))?;

    let record = match parsed.get("data") {
        Some(Value::Array(items)) => items.first(),
        Some(obj @ Value::Object(_)) => Some(obj),
        _ => None,
    }
    .ok_or_else(|| OracleError::ProviderMalformed("validator body has no `data` record".into()))?;

    Ok(Observation {
        validator: id.clone(),
        balance: amount_field(record, "balance")?,
        rewards: amount_field(record, "rewards")?,
    })
}

fn amount_field(record: &Value, field: &str) -> Result<u128> {
    let value = record
        .get(field)
        .ok_or_else(|| OracleError::ProviderMalformed(format!("missing `{field}`")))?;

    let parsed = match value {
        // Numbers keep their source text, so wei amounts beyond u64 survive.
        Value::Number(n) => n.to_string().parse::<u128>().ok(),
        Value::String(s) => s.trim().parse::<u128>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        OracleError::ProviderMalformed(format!(
            "`{field}` is not a non-negative integer: {value}"
        ))
    })
}

/// Accepts `{asset: {currency: price}}` or a top-level `price`.
pub(crate) fn parse_price_body(body: &str, asset: &str, currency: &str) -> Result<f64> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| OracleError::ProviderMalformed(format!("price body is not JSON: {e}")))?;

    let value = parsed
        .get(asset)
        .and_then(|a| a.get(currency))
        .or_else(|| parsed.get("price"))
        .ok_or_else(|| {
            OracleError::ProviderMalformed(format!("no {asset}/{currency} price in response"))
        })?;

    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| OracleError::ProviderMalformed(format!("price is not numeric: {value}")))
}
