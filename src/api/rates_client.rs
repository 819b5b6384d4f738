// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::CurrencyRateResponse;

pub const DEFAULT_ENDPOINT: &str = "https://api.coingecko.com/api/v3/exchange_rates";

/// Anything that can produce the current rate mapping
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<CurrencyRateResponse, FetchError>;
}

#[derive(Clone)]
pub struct RatesClient {
    client: Client,
    endpoint: String,
}

impl RatesClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl RateSource for RatesClient {
    async fn fetch_rates(&self) -> Result<CurrencyRateResponse, FetchError> {
        info!(endpoint = %self.endpoint, "fetching exchange rates");

        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        // Parse from text so shape errors come back as MalformedResponse rather
        // than as a transport error.
        let text = response.text().await?;
        let rates: CurrencyRateResponse = serde_json::from_str(&text)?;

        for (id, rate) in rates.rates.iter().filter(|(_, rate)| !rate.kind.is_known()) {
            warn!(currency_id = id, kind = rate.kind.as_str(), "unrecognised currency type");
        }

        debug!(count = rates.rates.len(), "parsed exchange rates");
        Ok(rates)
    }
}
