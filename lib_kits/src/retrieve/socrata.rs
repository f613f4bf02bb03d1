//! # Socrata Open-Data Portal Client
//!
//! Thin wrapper around `reqwest` for the two Socrata operations the
//! publishers need: reading a resource with SoQL query params and replacing a
//! resource's full contents. Any non-2xx response is surfaced immediately;
//! there is no retry at this layer.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::config::SocrataConfig;
use crate::error::KitsError;

/// Per-request timeout on portal calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one Socrata domain, authenticated with an app token plus an
/// API key id/secret pair.
pub struct SocrataClient {
    inner: reqwest::Client,
    base_url: Url,
    config: SocrataConfig,
}

impl SocrataClient {
    /// Creates a client for `domain` (e.g. `data.austintexas.gov`).
    pub fn new(domain: &str, config: SocrataConfig) -> Result<Self, KitsError> {
        let base_url = Url::parse(&format!("https://{}/", domain))?;
        let inner = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            inner,
            base_url,
            config,
        })
    }

    fn resource_url(&self, resource_id: &str) -> Result<Url, KitsError> {
        Ok(self
            .base_url
            .join(&format!("resource/{}.json", resource_id))?)
    }

    /// Fetches a resource as a JSON array of records. `params` carries SoQL
    /// query parameters such as `$where` and `$limit`.
    pub async fn get(
        &self,
        resource_id: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, KitsError> {
        let url = self.resource_url(resource_id)?;
        let response = self
            .inner
            .get(url)
            .header("X-App-Token", &self.config.app_token)
            .basic_auth(&self.config.api_key_id, Some(&self.config.api_key_secret))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KitsError::UpstreamHttpFailure {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Vec<Value>>().await?)
    }

    /// Replaces the entire contents of a resource with `records` (full
    /// replace, not an upsert).
    pub async fn replace<T: Serialize>(
        &self,
        resource_id: &str,
        records: &[T],
    ) -> Result<Value, KitsError> {
        let url = self.resource_url(resource_id)?;
        let response = self
            .inner
            .put(url)
            .header("X-App-Token", &self.config.app_token)
            .basic_auth(&self.config.api_key_id, Some(&self.config.api_key_secret))
            .json(records)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KitsError::UpstreamHttpFailure {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}
