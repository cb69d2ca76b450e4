use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use scout_core::detail::StockDetail;
use scout_core::table::{SortDirection, TablePage};

const TABLE_HEADER: [&str; 9] = [
    "Rank",
    "Ticker",
    "Name",
    "Multiplier",
    "Confidence",
    "Horizon",
    "Risk",
    "Sector",
    "Market",
];

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn stock_table(page: &TablePage<'_>) -> Table {
    let mut table = base_table();
    let arrow = match page.sort.direction {
        SortDirection::Asc => "▲",
        SortDirection::Desc => "▼",
    };
    let sorted = page.sort.key.as_str();
    table.set_header(TABLE_HEADER.iter().map(|h| {
        if sort_column(h) == sorted {
            Cell::new(format!("{h} {arrow}"))
        } else {
            Cell::new(h)
        }
    }));

    for r in &page.rows {
        table.add_row(vec![
            Cell::new(r.rank).set_alignment(CellAlignment::Right),
            Cell::new(&r.ticker),
            Cell::new(&r.name),
            Cell::new(r.multiplier_label()).set_alignment(CellAlignment::Right),
            Cell::new(format!("{}%", r.confidence_percent())).set_alignment(CellAlignment::Right),
            Cell::new(r.horizon_label()).set_alignment(CellAlignment::Right),
            Cell::new(r.risk_level),
            Cell::new(&r.sector),
            Cell::new(&r.market),
        ]);
    }
    table
}

fn sort_column(header: &str) -> &'static str {
    match header {
        "Rank" => "rank",
        "Ticker" => "ticker",
        "Name" => "name",
        "Multiplier" => "predicted_multiplier",
        "Confidence" => "confidence",
        "Horizon" => "time_horizon_days",
        "Risk" => "risk_level",
        "Sector" => "sector",
        _ => "market",
    }
}

pub fn page_footer(page: &TablePage<'_>) -> String {
    if page.total_filtered == 0 {
        return "No stocks match the current filters.".to_string();
    }
    format!(
        "Page {} of {} ({} matching)",
        page.page, page.total_pages, page.total_filtered
    )
}

pub fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn detail_report(detail: &StockDetail<'_>) -> String {
    let s = detail.stock;
    let mut out = String::new();

    out.push_str(&detail.title());
    out.push('\n');

    let mut summary = base_table();
    let rows = [
        ("Predicted multiplier", s.multiplier_label()),
        ("Confidence", format!("{}%", s.confidence_percent())),
        ("Time horizon", s.horizon_label()),
        ("Risk level", s.risk_level.to_string()),
        ("Sector", s.sector.clone()),
        ("Market", s.market.clone()),
        ("Last updated", timestamp(s.last_updated)),
    ];
    for (label, value) in rows {
        summary.add_row(vec![label.to_string(), value]);
    }
    out.push_str(&summary.to_string());
    out.push_str("\n\nKey drivers\n");
    for d in &s.key_drivers {
        out.push_str(&format!("  + {d}\n"));
    }
    out.push_str("\nRisk flags\n");
    for f in &s.risk_flags {
        out.push_str(&format!("  ! {f}\n"));
    }

    out.push_str("\nBacktest history\n");
    if detail.has_history() {
        let mut backtests = base_table();
        backtests.set_header(vec!["Entry", "Exit", "Multiplier"]);
        for b in detail.backtests {
            backtests.add_row(vec![
                Cell::new(b.entry_date),
                Cell::new(b.exit_date),
                Cell::new(format!("{}x", b.multiplier)).set_alignment(CellAlignment::Right),
            ]);
        }
        out.push_str(&backtests.to_string());
        out.push('\n');
    } else {
        out.push_str("  No backtest history for this ticker.\n");
    }

    out.push_str("\nFeature attribution\n");
    for a in detail.attribution {
        out.push_str(&format!("  {:<24} {:>6.2}\n", a.name, a.value));
    }

    if let (Some(first), Some(last)) = (detail.price_series.first(), detail.price_series.last()) {
        let (low, high) = detail
            .price_series
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.price), hi.max(p.price))
            });
        out.push_str(&format!(
            "\nPrice series ({} points)\n  {} {:.2} -> {} {:.2} (low {:.2}, high {:.2})\n",
            detail.price_series.len(),
            first.label,
            first.price,
            last.label,
            last.price,
            low,
            high
        ));
    }

    out
}
