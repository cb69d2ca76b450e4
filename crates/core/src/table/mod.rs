use crate::domain::stock::StockRecord;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

pub mod export;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const ALL_SECTORS: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Rank,
    Ticker,
    Name,
    PredictedMultiplier,
    Confidence,
    TimeHorizonDays,
    RiskLevel,
    Sector,
    Market,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Rank => "rank",
            SortKey::Ticker => "ticker",
            SortKey::Name => "name",
            SortKey::PredictedMultiplier => "predicted_multiplier",
            SortKey::Confidence => "confidence",
            SortKey::TimeHorizonDays => "time_horizon_days",
            SortKey::RiskLevel => "risk_level",
            SortKey::Sector => "sector",
            SortKey::Market => "market",
        }
    }

    fn compare(&self, a: &StockRecord, b: &StockRecord) -> Ordering {
        match self {
            SortKey::Rank => a.rank.cmp(&b.rank),
            SortKey::Ticker => a.ticker.cmp(&b.ticker),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::PredictedMultiplier => a.predicted_multiplier.total_cmp(&b.predicted_multiplier),
            SortKey::Confidence => a.confidence.total_cmp(&b.confidence),
            SortKey::TimeHorizonDays => a.time_horizon_days.cmp(&b.time_horizon_days),
            SortKey::RiskLevel => a.risk_level.cmp(&b.risk_level),
            SortKey::Sector => a.sector.cmp(&b.sector),
            SortKey::Market => a.market.cmp(&b.market),
        }
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "rank" => SortKey::Rank,
            "ticker" => SortKey::Ticker,
            "name" => SortKey::Name,
            "predicted_multiplier" | "multiplier" => SortKey::PredictedMultiplier,
            "confidence" => SortKey::Confidence,
            "time_horizon_days" | "horizon" => SortKey::TimeHorizonDays,
            "risk_level" | "risk" => SortKey::RiskLevel,
            "sector" => SortKey::Sector,
            "market" => SortKey::Market,
            other => bail!("unknown sort key: {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => bail!("unknown sort direction: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Rank,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// A new key starts ascending; the current key flips.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectorFilter {
    #[default]
    All,
    Exact(String),
}

impl SectorFilter {
    /// `"All"` and blank input both mean no filter.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ALL_SECTORS {
            SectorFilter::All
        } else {
            SectorFilter::Exact(s.to_string())
        }
    }

    pub fn matches(&self, record: &StockRecord) -> bool {
        match self {
            SectorFilter::All => true,
            SectorFilter::Exact(sector) => record.sector == *sector,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SectorFilter::All => ALL_SECTORS,
            SectorFilter::Exact(sector) => sector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub sector: SectorFilter,
    pub search: String,
    pub sort: SortState,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            sector: SectorFilter::All,
            search: String::new(),
            sort: SortState::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a StockRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_filtered: usize,
    pub sort: SortState,
}

/// Stable: equal keys keep their input order in both directions.
pub fn sort_records<'a>(records: &'a [StockRecord], sort: SortState) -> Vec<&'a StockRecord> {
    let mut out: Vec<&StockRecord> = records.iter().collect();
    out.sort_by(|a, b| {
        let ord = sort.key.compare(a, b);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    out
}

pub fn matches_search(record: &StockRecord, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record.name.to_lowercase().contains(&needle) || record.ticker.to_lowercase().contains(&needle)
}

pub fn filter_records<'a>(
    records: impl IntoIterator<Item = &'a StockRecord>,
    sector: &SectorFilter,
    search: &str,
) -> Vec<&'a StockRecord> {
    records
        .into_iter()
        .filter(|r| sector.matches(r))
        .filter(|r| matches_search(r, search))
        .collect()
}

/// Sorted and filtered, not paginated. This is the export set.
pub fn filtered_view<'a>(records: &'a [StockRecord], query: &TableQuery) -> Vec<&'a StockRecord> {
    let sorted = sort_records(records, query.sort);
    filter_records(sorted, &query.sector, &query.search)
}

pub fn total_pages(filtered: usize, page_size: usize) -> usize {
    filtered.div_ceil(page_size.max(1))
}

pub fn query<'a>(records: &'a [StockRecord], query: &TableQuery) -> TablePage<'a> {
    let filtered = filtered_view(records, query);
    let page_size = query.page_size.max(1);
    let total_filtered = filtered.len();
    let total_pages = total_pages(total_filtered, page_size);
    let page = query.page.clamp(1, total_pages.max(1));

    let rows = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    TablePage {
        rows,
        page,
        page_size,
        total_pages,
        total_filtered,
        sort: query.sort,
    }
}

/// `"All"` first, then each sector once in first-seen order.
pub fn sectors(records: &[StockRecord]) -> Vec<String> {
    let mut out = vec![ALL_SECTORS.to_string()];
    for record in records {
        if !out.iter().skip(1).any(|s| *s == record.sector) {
            out.push(record.sector.clone());
        }
    }
    out
}

/// Interactive table controls. Narrowing the result set returns to page 1.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    query: TableQuery,
}

impl TableState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: TableQuery {
                page_size: page_size.max(1),
                ..TableQuery::default()
            },
        }
    }

    pub fn query(&self) -> &TableQuery {
        &self.query
    }

    pub fn set_sector(&mut self, sector: SectorFilter) {
        self.query.sector = sector;
        self.query.page = 1;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
        self.query.page = 1;
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.query.sort = self.query.sort.toggle(key);
    }

    pub fn go_to_page(&mut self, records: &[StockRecord], page: usize) {
        let filtered = filtered_view(records, &self.query).len();
        let last = total_pages(filtered, self.query.page_size).max(1);
        self.query.page = page.clamp(1, last);
    }

    pub fn next_page(&mut self, records: &[StockRecord]) {
        self.go_to_page(records, self.query.page.saturating_add(1));
    }

    pub fn prev_page(&mut self, records: &[StockRecord]) {
        self.go_to_page(records, self.query.page.saturating_sub(1));
    }

    pub fn view<'a>(&self, records: &'a [StockRecord]) -> TablePage<'a> {
        query(records, &self.query)
    }
}
