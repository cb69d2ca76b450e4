use crate::domain::stock::{BacktestEntry, FeatureAttribution, PricePoint, StockRecord};
use crate::store::RecordStore;
use serde::Serialize;

/// Everything the detail view shows for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct StockDetail<'a> {
    pub stock: &'a StockRecord,
    pub backtests: &'a [BacktestEntry],
    pub price_series: Vec<PricePoint>,
    pub attribution: &'a [FeatureAttribution],
}

impl<'a> StockDetail<'a> {
    /// `None` means render nothing.
    pub fn project(store: &'a RecordStore, ticker: &str) -> Option<Self> {
        let stock = store.find(ticker)?;
        Some(Self {
            stock,
            backtests: store.backtests_for(&stock.ticker),
            price_series: store.price_series(&stock.ticker),
            attribution: store.attribution(),
        })
    }

    pub fn title(&self) -> String {
        format!("{} ({})", self.stock.name, self.stock.ticker)
    }

    pub fn has_history(&self) -> bool {
        !self.backtests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_record_with_history() {
        let store = RecordStore::builtin().unwrap();
        let detail = StockDetail::project(&store, "TSLA").unwrap();
        assert_eq!(detail.title(), "Tesla, Inc. (TSLA)");
        assert!(detail.has_history());
        assert_eq!(detail.backtests.len(), 2);
        assert_eq!(detail.price_series.len(), 30);
        assert_eq!(detail.attribution.len(), 5);
    }

    #[test]
    fn record_without_history_still_projects() {
        let store = RecordStore::builtin().unwrap();
        let detail = StockDetail::project(&store, "RBLX").unwrap();
        assert!(!detail.has_history());
        assert_eq!(detail.stock.risk_level.as_str(), "High");
    }

    #[test]
    fn absent_record_renders_nothing() {
        let store = RecordStore::builtin().unwrap();
        assert!(StockDetail::project(&store, "MSFT").is_none());
    }
}
