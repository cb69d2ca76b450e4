use crate::domain::contract;
use crate::domain::stock::{BacktestEntry, FeatureAttribution, PricePoint, StockRecord};
use std::collections::BTreeMap;

mod seed;

pub const PRICE_SERIES_LEN: usize = 30;

/// Read-only record set for one session.
#[derive(Debug, Clone)]
pub struct RecordStore {
    stocks: Vec<StockRecord>,
    backtests: BTreeMap<String, Vec<BacktestEntry>>,
    attribution: Vec<FeatureAttribution>,
}

impl RecordStore {
    pub fn new(
        stocks: Vec<StockRecord>,
        backtests: BTreeMap<String, Vec<BacktestEntry>>,
        attribution: Vec<FeatureAttribution>,
    ) -> anyhow::Result<Self> {
        contract::validate_records(&stocks)?;
        contract::validate_backtests(&stocks, &backtests)?;
        Ok(Self {
            stocks,
            backtests,
            attribution,
        })
    }

    /// The bundled mock data set.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::new(seed::stocks(), seed::backtests(), seed::attribution())
    }

    pub fn stocks(&self) -> &[StockRecord] {
        &self.stocks
    }

    pub fn find(&self, ticker: &str) -> Option<&StockRecord> {
        self.stocks.iter().find(|s| s.ticker == ticker)
    }

    /// Empty when the ticker has no history.
    pub fn backtests_for(&self, ticker: &str) -> &[BacktestEntry] {
        self.backtests
            .get(ticker)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn attribution(&self) -> &[FeatureAttribution] {
        &self.attribution
    }

    /// Illustrative price path: upward drift plus a ticker-seeded wobble.
    /// Same ticker, same series.
    pub fn price_series(&self, ticker: &str) -> Vec<PricePoint> {
        let mut state = ticker_seed(ticker);
        (0..PRICE_SERIES_LEN)
            .map(|i| {
                state = xorshift(state);
                let noise = (state >> 11) as f64 / (1u64 << 53) as f64;
                let x = i as f64;
                let price = 100.0 + noise * 20.0 * (x / 3.0).sin() + x * 2.0;
                PricePoint {
                    label: format!("Day {}", i + 1),
                    price: (price * 100.0).round() / 100.0,
                }
            })
            .collect()
    }
}

// FNV-1a
fn ticker_seed(ticker: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in ticker.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash.max(1)
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}
