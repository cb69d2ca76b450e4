use crate::domain::stock::StockRecord;
use crate::table::{filtered_view, TableQuery};
use anyhow::Context;
use chrono::SecondsFormat;

/// Joins list-valued fields inside one cell. Never the field delimiter.
pub const LIST_SEPARATOR: &str = "; ";

/// CSV of the filtered (not paginated) set in the current sort order.
/// Every field is quoted; embedded quotes are doubled.
pub fn export_csv(records: &[StockRecord], query: &TableQuery) -> anyhow::Result<String> {
    let rows = filtered_view(records, query);

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(StockRecord::FIELD_NAMES)
        .context("failed to write csv header")?;

    for record in &rows {
        wtr.write_record(row(record))
            .with_context(|| format!("failed to write csv row for {}", record.ticker))?;
    }

    let bytes = wtr.into_inner().context("failed to flush csv writer")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

fn row(record: &StockRecord) -> [String; 12] {
    [
        record.rank.to_string(),
        record.ticker.clone(),
        record.name.clone(),
        record.predicted_multiplier.to_string(),
        record.confidence.to_string(),
        record.time_horizon_days.to_string(),
        record.key_drivers.join(LIST_SEPARATOR),
        record.risk_flags.join(LIST_SEPARATOR),
        record.risk_level.to_string(),
        record.sector.clone(),
        record.market.clone(),
        record
            .last_updated
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
    ]
}
