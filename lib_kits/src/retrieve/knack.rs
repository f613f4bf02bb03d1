//! # Knack Client
//!
//! Reads the currently published DMS records from a Knack view and applies
//! row-level updates to the backing object. View reads are paginated; updates
//! target one record at a time. Non-2xx responses are fatal, no retry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::KnackConfig;
use crate::error::KitsError;

const KNACK_API_BASE: &str = "https://api.knack.com/v1";

/// Per-request timeout on Knack calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for view reads.
const ROWS_PER_PAGE: usize = 1000;

pub struct KnackClient {
    inner: reqwest::Client,
    config: KnackConfig,
}

impl KnackClient {
    pub fn new(config: KnackConfig) -> Result<Self, KitsError> {
        let inner = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { inner, config })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.config.app_id) {
            headers.insert("X-Knack-Application-Id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.config.api_key) {
            headers.insert("X-Knack-REST-API-Key", value);
        }
        headers
    }

    /// Fetches every record visible in the configured scene/view.
    pub async fn get_view_records(&self) -> Result<Vec<Value>, KitsError> {
        let url = format!(
            "{}/pages/{}/views/{}/records",
            KNACK_API_BASE, self.config.scene, self.config.view
        );

        let mut records: Vec<Value> = Vec::new();
        let mut page: usize = 1;

        loop {
            let response = self
                .inner
                .get(&url)
                .headers(self.auth_headers())
                .query(&[
                    ("rows_per_page", ROWS_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
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

            let body = response.json::<Value>().await?;
            let page_records = body
                .get("records")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let fetched = page_records.len();
            debug!("Knack view page {}: {} records", page, fetched);
            records.extend(page_records);

            // a short page means we have reached the end
            if fetched < ROWS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// Updates one record in the configured object with a partial field set.
    pub async fn update_record(
        &self,
        record_id: &str,
        fields: &Value,
    ) -> Result<Value, KitsError> {
        let url = format!(
            "{}/objects/{}/records/{}",
            KNACK_API_BASE, self.config.object, record_id
        );

        let response = self
            .inner
            .put(&url)
            .headers(self.auth_headers())
            .json(fields)
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
