use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::EstimateProvider;
use crate::config::ValuationConfig;
use crate::model::estimate::RepliersEstimate;
use crate::model::{PropertyDescription, ProviderEstimate};

pub struct RepliersProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl RepliersProvider {
    pub fn new(client: Client, config: &ValuationConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: config.repliers_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EstimateProvider for RepliersProvider {
    fn name(&self) -> &'static str {
        "repliers"
    }

    async fn estimate(&self, property: &PropertyDescription) -> Result<ProviderEstimate> {
        let url = format!("{}/estimates", self.base_url);

        let mut request = self.client.post(&url).json(property);
        if let Some(key) = &self.api_key {
            request = request.header("REPLIERS-API-KEY", key);
        }

        let response = request.send().await.context("Repliers API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Repliers API returned {}: {}", status, body);
        }

        let estimate: RepliersEstimate = response
            .json()
            .await
            .context("Failed to parse Repliers response")?;

        Ok(ProviderEstimate::Repliers(estimate))
    }
}
