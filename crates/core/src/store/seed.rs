use crate::domain::stock::{BacktestEntry, FeatureAttribution, RiskLevel, StockRecord};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

const DAYS_12M: u32 = 365;
const DAYS_18M: u32 = 548;
const DAYS_24M: u32 = 730;

struct Seed {
    ticker: &'static str,
    name: &'static str,
    multiplier: f64,
    confidence: f64,
    horizon_days: u32,
    drivers: &'static [&'static str],
    risks: &'static [&'static str],
    risk_level: RiskLevel,
    sector: &'static str,
    market: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        ticker: "NVDA",
        name: "NVIDIA Corp",
        multiplier: 3.5,
        confidence: 0.92,
        horizon_days: DAYS_12M,
        drivers: &["AI Chip Dominance", "Strong Earnings Growth", "Data Center Expansion"],
        risks: &["High Valuation", "Geopolitical Tensions", "Competition"],
        risk_level: RiskLevel::Medium,
        sector: "Technology",
        market: "NASDAQ",
    },
    Seed {
        ticker: "TSLA",
        name: "Tesla, Inc.",
        multiplier: 2.8,
        confidence: 0.85,
        horizon_days: DAYS_18M,
        drivers: &["EV Market Leadership", "Autonomous Driving Tech", "Energy Storage Growth"],
        risks: &["Production Scalability", "Regulatory Scrutiny"],
        risk_level: RiskLevel::High,
        sector: "Consumer Cyclical",
        market: "NASDAQ",
    },
    Seed {
        ticker: "CRWD",
        name: "CrowdStrike Holdings",
        multiplier: 4.1,
        confidence: 0.88,
        horizon_days: DAYS_24M,
        drivers: &["Leader in Endpoint Security", "Strong Subscription Growth", "Expanding TAM"],
        risks: &["High Competition in Cybersecurity", "Valuation Concerns"],
        risk_level: RiskLevel::Medium,
        sector: "Technology",
        market: "NASDAQ",
    },
    Seed {
        ticker: "PLTR",
        name: "Palantir Technologies",
        multiplier: 3.2,
        confidence: 0.81,
        horizon_days: DAYS_12M,
        drivers: &["Government Contracts", "Commercial Expansion (AIP)", "Unique Data Platform"],
        risks: &["Contract Dependency", "Negative Sentiment", "Complex Sales Cycle"],
        risk_level: RiskLevel::High,
        sector: "Technology",
        market: "NYSE",
    },
    Seed {
        ticker: "SNOW",
        name: "Snowflake Inc.",
        multiplier: 2.5,
        confidence: 0.90,
        horizon_days: DAYS_18M,
        drivers: &["Cloud Data Platform Leader", "High Net Revenue Retention", "Usage-Based Model"],
        risks: &["Intense Competition", "High Stock-Based Compensation"],
        risk_level: RiskLevel::Medium,
        sector: "Technology",
        market: "NYSE",
    },
    Seed {
        ticker: "U",
        name: "Unity Software Inc.",
        multiplier: 5.2,
        confidence: 0.75,
        horizon_days: DAYS_24M,
        drivers: &[
            "Dominant Gaming Engine",
            "Expansion into non-gaming industries",
            "New Pricing Model Adoption",
        ],
        risks: &["Recent Controversies", "Dependence on Gaming Market"],
        risk_level: RiskLevel::High,
        sector: "Technology",
        market: "NYSE",
    },
    Seed {
        ticker: "AMD",
        name: "Advanced Micro Devices",
        multiplier: 2.9,
        confidence: 0.89,
        horizon_days: DAYS_12M,
        drivers: &[
            "Competitive CPU/GPU products",
            "Data Center Market Share Gains",
            "Xilinx Acquisition Synergy",
        ],
        risks: &["Cyclical Semiconductor Industry", "Supply Chain Risks"],
        risk_level: RiskLevel::Medium,
        sector: "Technology",
        market: "NASDAQ",
    },
    Seed {
        ticker: "SHOP",
        name: "Shopify Inc.",
        multiplier: 3.0,
        confidence: 0.83,
        horizon_days: DAYS_18M,
        drivers: &[
            "E-commerce Platform Growth",
            "Merchant Solutions Expansion",
            "International Markets",
        ],
        risks: &["Competition from Amazon", "Slowing E-commerce Growth Post-Pandemic"],
        risk_level: RiskLevel::Medium,
        sector: "Technology",
        market: "NYSE",
    },
    Seed {
        ticker: "RBLX",
        name: "Roblox Corp",
        multiplier: 4.5,
        confidence: 0.78,
        horizon_days: DAYS_24M,
        drivers: &["Growing User Base (Gen Z)", "Metaverse Platform Potential", "Creator Economy"],
        risks: &["Monetization Challenges", "Content Moderation Risks"],
        risk_level: RiskLevel::High,
        sector: "Communication Services",
        market: "NYSE",
    },
    Seed {
        ticker: "ABNB",
        name: "Airbnb, Inc.",
        multiplier: 2.2,
        confidence: 0.86,
        horizon_days: DAYS_12M,
        drivers: &["Travel Industry Rebound", "Flexible Work Trends", "Strong Brand Recognition"],
        risks: &["Regulatory Hurdles", "Economic Downturn Impacting Travel"],
        risk_level: RiskLevel::Low,
        sector: "Consumer Cyclical",
        market: "NASDAQ",
    },
];

fn seeded_at() -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2024, 7, 26, 8, 0, 0).single()
}

pub(crate) fn stocks() -> Vec<StockRecord> {
    let last_updated = seeded_at();
    SEEDS
        .iter()
        .zip(1u32..)
        .map(|(seed, rank)| StockRecord {
            rank,
            ticker: seed.ticker.to_string(),
            name: seed.name.to_string(),
            predicted_multiplier: seed.multiplier,
            confidence: seed.confidence,
            time_horizon_days: seed.horizon_days,
            key_drivers: seed.drivers.iter().map(|s| s.to_string()).collect(),
            risk_flags: seed.risks.iter().map(|s| s.to_string()).collect(),
            risk_level: seed.risk_level,
            sector: seed.sector.to_string(),
            market: seed.market.to_string(),
            last_updated,
        })
        .collect()
}

pub(crate) fn backtests() -> BTreeMap<String, Vec<BacktestEntry>> {
    let rows: &[(&str, (i32, u32, u32), (i32, u32, u32), f64)] = &[
        ("NVDA", (2022, 1, 15), (2022, 7, 15), 1.8),
        ("NVDA", (2022, 8, 1), (2023, 2, 1), 2.5),
        ("TSLA", (2021, 11, 10), (2022, 5, 10), 1.5),
        ("TSLA", (2022, 6, 20), (2022, 12, 20), 2.1),
    ];

    let mut out: BTreeMap<String, Vec<BacktestEntry>> = BTreeMap::new();
    for &(ticker, entry, exit, multiplier) in rows {
        let (Some(entry_date), Some(exit_date)) = (
            NaiveDate::from_ymd_opt(entry.0, entry.1, entry.2),
            NaiveDate::from_ymd_opt(exit.0, exit.1, exit.2),
        ) else {
            continue;
        };
        out.entry(ticker.to_string()).or_default().push(BacktestEntry {
            ticker: ticker.to_string(),
            entry_date,
            exit_date,
            multiplier,
        });
    }
    out
}

pub(crate) fn attribution() -> Vec<FeatureAttribution> {
    [
        ("P/E Ratio", 0.15),
        ("RSI (14)", 0.25),
        ("News Sentiment", 0.35),
        ("Insider Buying", 0.10),
        ("Volume Spike", 0.15),
    ]
    .into_iter()
    .map(|(name, value)| FeatureAttribution {
        name: name.to_string(),
        value,
    })
    .collect()
}
