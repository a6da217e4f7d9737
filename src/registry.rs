//! HTTP client for the external identity registry.

use std::time::Duration;

use crate::config::RegistryConfig;
use crate::error::EngineError;

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    search_path: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            search_path: config.search_path.clone(),
        })
    }

    /// One searchRetrieve GET. Any transport failure or non-success status
    /// is a `SearchUnavailable`, so callers can tell "search failed"
    /// apart from "no matches".
    pub async fn search_retrieve(
        &self,
        params: &[(String, String)],
    ) -> Result<String, EngineError> {
        let url = format!("{}{}", self.base_url, self.search_path);
        tracing::debug!(url = %url, "querying registry");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/xml")
            .query(params)
            .send()
            .await
            .map_err(|e| EngineError::SearchUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::SearchUnavailable(format!(
                "registry returned HTTP {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EngineError::SearchUnavailable(e.to_string()))
    }
}
