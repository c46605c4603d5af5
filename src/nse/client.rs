// =============================================================================
// NSE Option-Chain Client - browser-like session over reqwest
// =============================================================================
//
// The NSE API rejects generic automated clients. Every request carries
// desktop-browser headers, and each fetch first loads the option-chain
// landing page so that the session cookies the data endpoint expects are
// present in the client's cookie jar.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use super::{DataSource, FetchError, FetchStage, RawPayload};

/// Default upstream host.
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client for the NSE index option-chain endpoint.
#[derive(Clone)]
pub struct NseClient {
    base_url: String,
    symbol: String,
    client: reqwest::Client,
}

impl NseClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client for `symbol` (e.g. "NIFTY") against `base_url`.
    ///
    /// `timeout` bounds each individual request, warm-up included.
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let symbol = symbol.into().trim().to_uppercase();

        let client = reqwest::Client::builder()
            .default_headers(Self::browser_headers(&base_url))
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for NseClient")?;

        debug!(base_url = %base_url, symbol = %symbol, "NseClient initialised");

        Ok(Self {
            base_url,
            symbol,
            client,
        })
    }

    fn browser_headers(base_url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json,text/plain,*/*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        if let Ok(referer) = HeaderValue::from_str(&format!("{base_url}/option-chain")) {
            headers.insert(header::REFERER, referer);
        }
        headers
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn landing_url(&self) -> String {
        format!("{}/option-chain", self.base_url)
    }

    fn option_chain_url(&self) -> String {
        format!(
            "{}/api/option-chain-indices?symbol={}",
            self.base_url, self.symbol
        )
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// GET the landing page to populate session cookies.
    ///
    /// Only transport failures abort the fetch; a non-success status is left
    /// for the data request to report.
    pub async fn warm_up(&self) -> Result<(), FetchError> {
        let resp = self
            .client
            .get(self.landing_url())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(FetchStage::WarmUp, e))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, "warm-up returned non-success status, continuing");
        }
        Ok(())
    }

    /// Warm up the session, then GET the option chain for the configured
    /// symbol.
    #[instrument(skip(self), fields(symbol = %self.symbol), name = "nse::fetch_option_chain")]
    pub async fn fetch_option_chain(&self) -> Result<RawPayload, FetchError> {
        self.warm_up().await?;

        let stage = FetchStage::OptionChain;
        let resp = self
            .client
            .get(self.option_chain_url())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(stage, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { stage, status });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(stage, e))?;

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode { stage, source })?;

        debug!(bytes = body.len(), "option chain retrieved");
        Ok(RawPayload(value))
    }
}

#[async_trait]
impl DataSource for NseClient {
    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        self.fetch_option_chain().await
    }
}
