use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;

use crate::config::{NetworkConfig, SourceConfig};
use crate::error::{MonitorError, Result};
use crate::model::{Month, PeriodOrdinal, PeriodRecordSet};
use crate::traits::PeriodSource;

/// Period source backed by weekly JSON files served over HTTP.
#[derive(Clone)]
pub struct HttpPeriodSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpPeriodSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPeriodSource")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpPeriodSource {
    /// Create a new source with configurable timeouts.
    pub fn new(source: &SourceConfig, network_config: &NetworkConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            token: source.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// URL of one week's file, e.g. `{base}/status/01-enero/semana2.json`.
    pub fn period_url(&self, month: &Month, period: PeriodOrdinal) -> String {
        format!(
            "{}/status/{}/semana{}.json",
            self.base_url,
            month.path_segment(),
            period
        )
    }
}

impl PeriodSource for HttpPeriodSource {
    async fn resolve_period(
        &self,
        month: &Month,
        period: PeriodOrdinal,
    ) -> Result<Option<PeriodRecordSet>> {
        let url = self.period_url(month, period);
        tracing::debug!(%url, "Fetching period data");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|source| MonitorError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%url, "No data for period");
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "Data source returned error status");
            return Err(MonitorError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| MonitorError::Http {
            url: url.clone(),
            source,
        })?;

        let value: serde_json::Value = serde_json::from_str(&body)?;
        let is_empty = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Object(entries) => entries.is_empty(),
            _ => false,
        };
        if is_empty {
            tracing::debug!(%url, "Period file is empty");
            return Ok(None);
        }

        let records = PeriodRecordSet::from_json(value)?;
        tracing::debug!(
            %url,
            cameras = records.len(),
            rejected = records.rejected().len(),
            "Period data loaded"
        );

        Ok(Some(records))
    }
}
