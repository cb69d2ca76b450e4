use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_core::chat::ChatPanel;
use scout_core::detail::StockDetail;
use scout_core::llm::gemini::GeminiClient;
use scout_core::store::RecordStore;
use scout_core::table::{self, SectorFilter, SortDirection, SortKey, SortState, TableQuery};

mod browse;
mod render;
mod repl;

#[derive(Debug, Parser)]
#[command(name = "scout", about = "Browse predicted high-multiplier stocks and ask the market assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one page of the filtered, sorted stock table.
    Table {
        #[command(flatten)]
        filter: FilterArgs,

        /// 1-based page number. Out-of-range values are clamped.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page. Defaults to TABLE_PAGE_SIZE.
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Interactive table: filter, sort and page through the list.
    Browse {
        /// Rows per page. Defaults to TABLE_PAGE_SIZE.
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Export every row matching the filters as CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the detail view for one ticker.
    Detail { ticker: String },
    /// Interactive chat with the market assistant.
    Chat {
        /// Start in deep-analysis mode.
        #[arg(long)]
        thinking: bool,
    },
}

#[derive(Debug, clap::Args)]
struct FilterArgs {
    /// Exact sector name, or "All".
    #[arg(long)]
    sector: Option<String>,

    /// Case-insensitive match on ticker or name.
    #[arg(long)]
    search: Option<String>,

    /// Column to sort by (rank, ticker, name, multiplier, confidence, horizon, risk, sector, market).
    #[arg(long, default_value = "rank")]
    sort: String,

    /// Sort descending.
    #[arg(long)]
    desc: bool,
}

impl FilterArgs {
    fn into_query(self, page: usize, page_size: usize) -> anyhow::Result<TableQuery> {
        let key: SortKey = self.sort.parse().context("invalid --sort")?;
        let direction = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Ok(TableQuery {
            sector: SectorFilter::parse(self.sector.as_deref().unwrap_or_default()),
            search: self.search.unwrap_or_default(),
            sort: SortState::new(key, direction),
            page,
            page_size,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = scout_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();
    let store = RecordStore::builtin()?;

    match cli.command {
        Command::Table {
            filter,
            page,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(settings.table_page_size);
            anyhow::ensure!(page_size >= 1, "--page-size must be >= 1");
            let query = filter.into_query(page, page_size)?;
            let view = table::query(store.stocks(), &query);
            println!("Sector: {}", query.sector.label());
            println!("{}", render::stock_table(&view));
            println!("{}", render::page_footer(&view));
        }
        Command::Browse { page_size } => {
            let page_size = page_size.unwrap_or(settings.table_page_size);
            anyhow::ensure!(page_size >= 1, "--page-size must be >= 1");
            browse::run(&store, page_size).await?;
        }
        Command::Export { filter, out } => {
            let query = filter.into_query(1, settings.table_page_size)?;
            let csv = table::export::export_csv(store.stocks(), &query)?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, csv)
                        .await
                        .with_context(|| format!("write {} failed", path.display()))?;
                    tracing::info!(path = %path.display(), "exported stock table");
                }
                None => print!("{csv}"),
            }
        }
        Command::Detail { ticker } => {
            let detail = StockDetail::project(&store, &ticker)
                .with_context(|| format!("unknown ticker: {ticker}"))?;
            print!("{}", render::detail_report(&detail));
        }
        Command::Chat { thinking } => {
            let client = match GeminiClient::from_settings(&settings) {
                Ok(client) => client,
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "collaborator client init failed");
                    return Err(e);
                }
            };
            let panel = ChatPanel::open(Arc::new(client));
            panel.set_thinking_mode(thinking).await;
            repl::run(panel).await?;
        }
    }

    Ok(())
}

fn init_sentry(settings: &scout_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
