use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EstimateProvider;
use crate::config::ValuationConfig;
use crate::model::estimate::DeepSeekEstimate;
use crate::model::{PropertyDescription, ProviderEstimate};

pub struct DeepSeekProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    market: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a professional residential real estate appraiser. You produce data-driven market valuations from property characteristics, comparable sales and current market conditions. You always answer with a single valid JSON object and nothing else.";

impl DeepSeekProvider {
    pub fn new(client: Client, config: &ValuationConfig, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: config.deepseek_model.clone(),
            base_url: config.deepseek_base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            market: config.market.clone(),
        }
    }
}

#[async_trait]
impl EstimateProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn estimate(&self, property: &PropertyDescription) -> Result<ProviderEstimate> {
        let url = format!("{}/chat/completions", self.base_url);
        let months = trailing_months(Utc::now().date_naive(), 12);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: build_prompt(property, &self.market, &months),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("DeepSeek API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("DeepSeek API returned {}: {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse DeepSeek response")?;

        let content = chat
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .context("No content in DeepSeek response")?;

        let parsed = parse_valuation(content)?;
        Ok(ProviderEstimate::DeepSeek(parsed))
    }
}

/// Model output sometimes arrives wrapped in a Markdown code fence.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```JSON") {
        s = rest;
    }
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

pub fn parse_valuation(content: &str) -> Result<DeepSeekEstimate> {
    serde_json::from_str(strip_code_fence(content))
        .context("Failed to parse valuation JSON from DeepSeek")
}

fn trailing_months(today: NaiveDate, n: u32) -> Vec<String> {
    let this_month = today.with_day(1).unwrap_or(today);
    (1..=n)
        .rev()
        .filter_map(|back| this_month.checked_sub_months(Months::new(back)))
        .map(|d| d.format("%b %Y").to_string())
        .collect()
}

fn build_prompt(property: &PropertyDescription, market: &str, months: &[String]) -> String {
    let d = &property.details;
    let or_unknown = |s: &str| {
        if s.trim().is_empty() {
            "Unknown".to_string()
        } else {
            s.trim().to_string()
        }
    };
    let year_built = d
        .year_built
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let history = months
        .iter()
        .map(|m| format!("    {{\"month\": \"{}\", \"value\": <number>}}", m))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"Estimate the current market value of this residential property in {market}.

Property:
- Address: {address}
- Property type: {property_type}
- Style: {style}
- Bedrooms: {bedrooms}
- Bathrooms: {bathrooms}
- Square feet: {sqft}
- Year built: {year_built}
- Parking spaces: {parking}
- Basement: {basement}
- Basement finished: {basement_finished}
- Basement bedrooms: {basement_bedrooms}
- Annual property taxes: ${taxes:.0}

Weigh location and neighbourhood, size, age and likely condition, recent comparable sales nearby, current market conditions in {market}, and the tax amount as a hint of assessed value.

Answer with this JSON object only:
{{
  "estimate": {{"value": <number>, "low": <number>, "high": <number>}},
  "confidence": <number between 0 and 1>,
  "pricePerSqft": <number>,
  "marketTrend": "<up|down|stable>",
  "trendPercentage": <number, annual change in percent>,
  "insights": ["<insight>", "<insight>", "<insight>"],
  "comparables": [
    {{"address": "<nearby address>", "price": <number>, "sqft": <number>, "soldDate": "<month year>"}}
  ],
  "historicalValues": [
{history}
  ]
}}"#,
        market = market,
        address = or_unknown(&property.composed_address()),
        property_type = or_unknown(&d.property_type),
        style = or_unknown(&d.style),
        bedrooms = d.num_bedrooms,
        bathrooms = d.num_bathrooms,
        sqft = or_unknown(&d.sqft),
        year_built = year_built,
        parking = d.num_parking_spaces,
        basement = or_unknown(&d.basement1),
        basement_finished = or_unknown(&d.basement_finished),
        basement_bedrooms = d.basement_bedrooms,
        taxes = property.taxes.annual_amount,
        history = history,
    )
}
