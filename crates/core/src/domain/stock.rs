use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    pub rank: u32,
    pub ticker: String,
    pub name: String,
    pub predicted_multiplier: f64,
    /// Fraction in [0, 1]. Percentages are a display concern only.
    pub confidence: f64,
    pub time_horizon_days: u32,
    pub key_drivers: Vec<String>,
    pub risk_flags: Vec<String>,
    pub risk_level: RiskLevel,
    pub sector: String,
    pub market: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl StockRecord {
    /// Field names in declaration order. Used as the export header.
    pub const FIELD_NAMES: [&'static str; 12] = [
        "rank",
        "ticker",
        "name",
        "predicted_multiplier",
        "confidence",
        "time_horizon_days",
        "key_drivers",
        "risk_flags",
        "risk_level",
        "sector",
        "market",
        "last_updated",
    ];

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }

    pub fn multiplier_label(&self) -> String {
        format!("{}x", self.predicted_multiplier)
    }

    pub fn horizon_label(&self) -> String {
        format!("{}d", self.time_horizon_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestEntry {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub label: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureAttribution {
    pub name: String,
    pub value: f64,
}
