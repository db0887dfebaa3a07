use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::lenient::{
    amount_or_zero, lenient_string, number, optional_amount, optional_string, required_amount,
    string_list,
};

pub const MAX_HISTORY_POINTS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    DeepSeek,
    Repliers,
}

impl EstimateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateSource::DeepSeek => "deepseek",
            EstimateSource::Repliers => "repliers",
        }
    }
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Up,
    Down,
    Stable,
}

impl MarketTrend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "up" => Some(MarketTrend::Up),
            "down" => Some(MarketTrend::Down),
            "stable" => Some(MarketTrend::Stable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationEstimate {
    pub estimate: EstimateRange,
    /// 0.0-1.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_sqft: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_trend: Option<MarketTrend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_percentage: Option<f64>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub comparables: Vec<Comparable>,
    #[serde(default)]
    pub historical_values: Vec<HistoricalValue>,
    pub source: EstimateSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateRange {
    pub value: f64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default, deserialize_with = "optional_amount", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount", skip_serializing_if = "Option::is_none")]
    pub sqft: Option<f64>,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub sold_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalValue {
    pub month: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepSeekEstimate {
    pub estimate: DeepSeekRange,
    #[serde(default, deserialize_with = "optional_amount")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub price_per_sqft: Option<f64>,
    #[serde(default, deserialize_with = "optional_string")]
    pub market_trend: Option<String>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub trend_percentage: Option<f64>,
    #[serde(default, deserialize_with = "string_list")]
    pub insights: Vec<String>,
    #[serde(default)]
    pub comparables: Option<Vec<Option<Comparable>>>,
    #[serde(default)]
    pub historical_values: Option<Vec<Option<DeepSeekHistoryPoint>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepSeekRange {
    #[serde(deserialize_with = "required_amount")]
    pub value: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub low: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub high: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepSeekHistoryPoint {
    #[serde(default, deserialize_with = "lenient_string")]
    pub month: String,
    #[serde(default, deserialize_with = "optional_amount")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliersEstimate {
    #[serde(default, deserialize_with = "optional_amount")]
    pub estimate_value: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub estimate_low: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub estimate_high: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub history: Option<RepliersHistory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepliersHistory {
    // "2024-03" or "2024-03-01"
    #[serde(default)]
    pub mth: Option<BTreeMap<String, Option<RepliersMonth>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepliersMonth {
    #[serde(default, deserialize_with = "optional_amount")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum ProviderEstimate {
    DeepSeek(DeepSeekEstimate),
    Repliers(RepliersEstimate),
}

impl ProviderEstimate {
    pub fn normalize(self) -> ValuationEstimate {
        match self {
            ProviderEstimate::DeepSeek(raw) => {
                let mut historical_values: Vec<HistoricalValue> = raw
                    .historical_values
                    .unwrap_or_default()
                    .into_iter()
                    .flatten()
                    .filter_map(|point| {
                        point.value.map(|value| HistoricalValue {
                            month: point.month,
                            value,
                        })
                    })
                    .collect();
                keep_last(&mut historical_values, MAX_HISTORY_POINTS);

                ValuationEstimate {
                    estimate: EstimateRange {
                        value: raw.estimate.value,
                        low: raw.estimate.low,
                        high: raw.estimate.high,
                    },
                    confidence: clamp_confidence(raw.confidence),
                    price_per_sqft: raw.price_per_sqft,
                    market_trend: raw.market_trend.as_deref().and_then(MarketTrend::parse),
                    trend_percentage: raw.trend_percentage,
                    insights: raw.insights,
                    comparables: raw.comparables.unwrap_or_default().into_iter().flatten().collect(),
                    historical_values,
                    source: EstimateSource::DeepSeek,
                }
            }
            ProviderEstimate::Repliers(raw) => {
                let mut historical_values: Vec<HistoricalValue> = raw
                    .history
                    .and_then(|h| h.mth)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(month, point)| {
                        point?.value.map(|value| HistoricalValue {
                            month: month_label(&month),
                            value,
                        })
                    })
                    .collect();
                keep_last(&mut historical_values, MAX_HISTORY_POINTS);

                ValuationEstimate {
                    estimate: EstimateRange {
                        value: raw.estimate_value.unwrap_or(0.0),
                        low: raw.estimate_low.unwrap_or(0.0),
                        high: raw.estimate_high.unwrap_or(0.0),
                    },
                    confidence: clamp_confidence(raw.confidence),
                    price_per_sqft: None,
                    market_trend: None,
                    trend_percentage: None,
                    insights: Vec::new(),
                    comparables: Vec::new(),
                    historical_values,
                    source: EstimateSource::Repliers,
                }
            }
        }
    }
}

fn clamp_confidence(raw: Option<f64>) -> f64 {
    raw.filter(|c| c.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0)
}

fn keep_last<T>(items: &mut Vec<T>, n: usize) {
    if items.len() > n {
        items.drain(..items.len() - n);
    }
}

fn month_label(key: &str) -> String {
    let parsed = NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d"));
    match parsed {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => key.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateSummary {
    pub value: f64,
    pub low: f64,
    pub high: f64,
    pub confidence: f64,
    pub source: String,
}

impl EstimateSummary {
    pub fn from_json(data: &Value) -> Self {
        let nested = |key: &str| data.get("estimate").and_then(|e| e.get(key)).and_then(number);
        let flat = |key: &str| data.get(key).and_then(number);

        Self {
            value: nested("value")
                .or_else(|| flat("estimateValue"))
                .or_else(|| flat("estimate"))
                .unwrap_or(0.0),
            low: nested("low").or_else(|| flat("estimateLow")).unwrap_or(0.0),
            high: nested("high").or_else(|| flat("estimateHigh")).unwrap_or(0.0),
            confidence: flat("confidence").unwrap_or(0.0),
            source: data
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl From<&ValuationEstimate> for EstimateSummary {
    fn from(estimate: &ValuationEstimate) -> Self {
        Self {
            value: estimate.estimate.value,
            low: estimate.estimate.low,
            high: estimate.estimate.high,
            confidence: estimate.confidence,
            source: estimate.source.to_string(),
        }
    }
}
