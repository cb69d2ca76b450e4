use crate::domain::stock::{BacktestEntry, StockRecord};
use anyhow::ensure;
use std::collections::{BTreeMap, BTreeSet};

/// Checks a record set before it is handed to the store.
pub fn validate_records(records: &[StockRecord]) -> anyhow::Result<()> {
    let mut seen_tickers = BTreeSet::<&str>::new();
    let mut seen_ranks = BTreeSet::<u32>::new();

    for record in records {
        let ticker = record.ticker.trim();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");
        ensure!(
            ticker == record.ticker,
            "ticker must not carry surrounding whitespace: {:?}",
            record.ticker
        );
        ensure!(
            seen_tickers.insert(ticker),
            "duplicate ticker: {ticker}"
        );

        ensure!(record.rank >= 1, "rank must be positive ({ticker})");
        ensure!(
            seen_ranks.insert(record.rank),
            "duplicate rank: {}",
            record.rank
        );

        ensure!(
            !record.name.trim().is_empty(),
            "name must be non-empty ({ticker})"
        );
        ensure!(
            record.predicted_multiplier.is_finite() && record.predicted_multiplier > 0.0,
            "predicted_multiplier must be positive ({ticker}, got {})",
            record.predicted_multiplier
        );
        ensure!(
            (0.0..=1.0).contains(&record.confidence),
            "confidence must be between 0 and 1 ({ticker}, got {})",
            record.confidence
        );
        ensure!(
            record.time_horizon_days > 0,
            "time_horizon_days must be positive ({ticker})"
        );
    }

    Ok(())
}

pub fn validate_backtests(
    records: &[StockRecord],
    backtests: &BTreeMap<String, Vec<BacktestEntry>>,
) -> anyhow::Result<()> {
    let known: BTreeSet<&str> = records.iter().map(|r| r.ticker.as_str()).collect();

    for (ticker, entries) in backtests {
        ensure!(
            known.contains(ticker.as_str()),
            "backtest history for unknown ticker: {ticker}"
        );
        for entry in entries {
            ensure!(
                entry.ticker == *ticker,
                "backtest entry ticker {} filed under {ticker}",
                entry.ticker
            );
            ensure!(
                entry.exit_date >= entry.entry_date,
                "backtest exit {} precedes entry {} ({ticker})",
                entry.exit_date,
                entry.entry_date
            );
            ensure!(
                entry.multiplier.is_finite() && entry.multiplier > 0.0,
                "backtest multiplier must be positive ({ticker}, got {})",
                entry.multiplier
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stock::RiskLevel;
    use chrono::NaiveDate;

    fn record(rank: u32, ticker: &str) -> StockRecord {
        StockRecord {
            rank,
            ticker: ticker.to_string(),
            name: format!("Name {ticker}"),
            predicted_multiplier: 2.0,
            confidence: 0.5,
            time_horizon_days: 365,
            key_drivers: vec!["a".to_string()],
            risk_flags: vec!["b".to_string()],
            risk_level: RiskLevel::Low,
            sector: "Technology".to_string(),
            market: "NYSE".to_string(),
            last_updated: None,
        }
    }

    #[test]
    fn accepts_valid_set() {
        let records = vec![record(1, "AAA"), record(2, "BBB")];
        assert!(validate_records(&records).is_ok());
    }

    #[test]
    fn rejects_duplicate_ticker() {
        let records = vec![record(1, "AAA"), record(2, "AAA")];
        assert!(validate_records(&records).is_err());
    }

    #[test]
    fn rejects_duplicate_rank() {
        let records = vec![record(1, "AAA"), record(1, "BBB")];
        assert!(validate_records(&records).is_err());
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let mut r = record(1, "AAA");
        r.confidence = 92.0;
        assert!(validate_records(&[r]).is_err());
    }

    #[test]
    fn rejects_history_for_unknown_ticker() {
        let records = vec![record(1, "AAA")];
        let mut backtests = BTreeMap::new();
        backtests.insert(
            "ZZZ".to_string(),
            vec![BacktestEntry {
                ticker: "ZZZ".to_string(),
                entry_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                exit_date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                multiplier: 1.2,
            }],
        );
        assert!(validate_backtests(&records, &backtests).is_err());
    }

    #[test]
    fn rejects_exit_before_entry() {
        let records = vec![record(1, "AAA")];
        let mut backtests = BTreeMap::new();
        backtests.insert(
            "AAA".to_string(),
            vec![BacktestEntry {
                ticker: "AAA".to_string(),
                entry_date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                exit_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                multiplier: 1.2,
            }],
        );
        assert!(validate_backtests(&records, &backtests).is_err());
    }
}
