//! Startup fetches of the static game documents. Required documents
//! propagate their errors (initialization aborts); enrichment documents
//! degrade to empty lookups with a warning. The feedback POST reports
//! HTTP success/failure only.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{FinancialMetrics, SectorInfo};

pub const DAILY_DOC: &str = "daily.json";
pub const ROSTER_DOC: &str = "obx.json";
pub const DESCRIPTIONS_DOC: &str = "descriptions.json";
pub const SECTORS_DOC: &str = "sectors.json";
pub const FINANCIALS_DOC: &str = "metrics.json";

pub struct DataFeed {
    client: Client,
    base: Url,
}

impl DataFeed {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).context("invalid data base URL")?;
        Ok(Self { client: Client::new(), base })
    }

    async fn fetch_json(&self, doc: &str) -> Result<Value> {
        let url = self.base.join(doc).context("invalid document path")?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("fetching {}", url))?
            .error_for_status()
            .with_context(|| format!("fetching {}", url))?;
        response
            .json()
            .await
            .with_context(|| format!("parsing {}", url))
    }

    /// Daily answer document. Required; failure is fatal to initialization.
    pub async fn fetch_daily(&self) -> Result<Value> {
        self.fetch_json(DAILY_DOC).await
    }

    /// Roster document. Required; failure is fatal to initialization.
    pub async fn fetch_roster(&self) -> Result<Value> {
        self.fetch_json(ROSTER_DOC).await
    }

    /// Short descriptions keyed by ticker. Optional enrichment.
    pub async fn fetch_descriptions(&self) -> HashMap<String, String> {
        self.fetch_optional(DESCRIPTIONS_DOC).await
    }

    /// Sector/industry lookup keyed by ticker. Optional enrichment.
    pub async fn fetch_sector_lookup(&self) -> HashMap<String, SectorInfo> {
        self.fetch_optional(SECTORS_DOC).await
    }

    /// Financial metrics keyed by base ticker. Optional enrichment.
    pub async fn fetch_financials(&self) -> HashMap<String, FinancialMetrics> {
        self.fetch_optional(FINANCIALS_DOC).await
    }

    async fn fetch_optional<T>(&self, doc: &str) -> HashMap<String, T>
    where
        T: serde::de::DeserializeOwned,
    {
        let result = self.fetch_json(doc).await.and_then(|v| {
            serde_json::from_value(v).with_context(|| format!("decoding {}", doc))
        });
        match result {
            Ok(map) => map,
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Feed,
                    "enrichment_unavailable",
                    obj(&[("doc", v_str(doc)), ("error", v_str(&format!("{:#}", err)))]),
                );
                HashMap::new()
            }
        }
    }

    /// Posts feedback to the external endpoint. Only the HTTP status is
    /// inspected; no structured response is parsed.
    pub async fn submit_feedback(&self, endpoint: &str, message: &str) -> Result<bool> {
        let url = Url::parse(endpoint).context("invalid feedback URL")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "message": message }))
            .send()
            .await
            .context("posting feedback")?;
        Ok(response.status().is_success())
    }
}
