use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use scout_core::detail::StockDetail;
use scout_core::store::RecordStore;
use scout_core::table::{SectorFilter, SortKey, TableState};

use crate::render;

const HELP: &str = "\
Commands:
  sector NAME|All   filter by sector
  search TEXT       match ticker or name (empty clears)
  sort KEY          sort by KEY; repeat to flip direction
  next | prev       change page
  page N            jump to page N
  open TICKER       show the detail view
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Sector(SectorFilter),
    Search(String),
    Sort(SortKey),
    Next,
    Prev,
    Page(usize),
    Open(String),
    Help,
    Quit,
}

fn parse(line: &str) -> anyhow::Result<Action> {
    let line = line.trim();
    let (verb, arg) = line
        .split_once(char::is_whitespace)
        .map(|(v, a)| (v, a.trim()))
        .unwrap_or((line, ""));

    Ok(match verb {
        "sector" => Action::Sector(SectorFilter::parse(arg)),
        "search" => Action::Search(arg.to_string()),
        "sort" => Action::Sort(arg.parse()?),
        "next" | "n" => Action::Next,
        "prev" | "p" => Action::Prev,
        "page" => Action::Page(
            arg.parse()
                .with_context(|| format!("page expects a number, got {arg:?}"))?,
        ),
        "open" if !arg.is_empty() => Action::Open(arg.to_string()),
        "help" | "?" | "" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => anyhow::bail!("unknown command: {other}"),
    })
}

/// Applies one action and returns the text to print, or `None` to quit.
fn apply(state: &mut TableState, store: &RecordStore, action: Action) -> Option<String> {
    let records = store.stocks();
    match action {
        Action::Sector(sector) => state.set_sector(sector),
        Action::Search(search) => state.set_search(search),
        Action::Sort(key) => state.toggle_sort(key),
        Action::Next => state.next_page(records),
        Action::Prev => state.prev_page(records),
        Action::Page(n) => state.go_to_page(records, n),
        Action::Open(ticker) => {
            return Some(match StockDetail::project(store, &ticker) {
                Some(detail) => render::detail_report(&detail),
                None => format!("unknown ticker: {ticker}\n"),
            });
        }
        Action::Help => return Some(format!("{HELP}\n")),
        Action::Quit => return None,
    }
    Some(screen(state, store))
}

fn screen(state: &TableState, store: &RecordStore) -> String {
    let view = state.view(store.stocks());
    let query = state.query();
    format!(
        "Sector: {}  Search: {:?}\n{}\n{}\n",
        query.sector.label(),
        query.search,
        render::stock_table(&view),
        render::page_footer(&view)
    )
}

/// Interactive table session over stdin.
pub async fn run(store: &RecordStore, page_size: usize) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut state = TableState::new(page_size);

    let first = format!("{}{HELP}\n> ", screen(&state, store));
    out.write_all(first.as_bytes()).await.context("write stdout failed")?;
    out.flush().await.context("flush stdout failed")?;

    while let Some(line) = lines.next_line().await.context("read stdin failed")? {
        let text = match parse(&line) {
            Ok(action) => match apply(&mut state, store, action) {
                Some(text) => text,
                None => break,
            },
            Err(err) => format!("{err:#}\n"),
        };
        out.write_all(text.as_bytes()).await.context("write stdout failed")?;
        out.write_all(b"> ").await.context("write stdout failed")?;
        out.flush().await.context("flush stdout failed")?;
    }
    Ok(())
}
