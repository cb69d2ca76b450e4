pub mod sessions;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use scout_core::chat::{ChatPanel, SessionSnapshot, TurnMode};
use scout_core::detail::StockDetail;
use scout_core::domain::chat::MessageId;
use scout_core::domain::stock::StockRecord;
use scout_core::llm::ChatCollaborator;
use scout_core::store::RecordStore;
use scout_core::table::{
    self, export::export_csv, SectorFilter, SortDirection, SortKey, SortState, TableQuery,
};
use sessions::{SessionLimits, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    store: Arc<RecordStore>,
    collaborator: Arc<dyn ChatCollaborator>,
    sessions: SessionRegistry,
    page_size: usize,
}

impl AppState {
    pub fn new(
        store: RecordStore,
        collaborator: Arc<dyn ChatCollaborator>,
        page_size: usize,
        limits: SessionLimits,
    ) -> Self {
        Self {
            store: Arc::new(store),
            collaborator,
            sessions: SessionRegistry::new(limits),
            page_size: page_size.max(1),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    async fn panel(&self, id: Uuid) -> Result<ChatPanel, StatusCode> {
        self.sessions.get(id).await.ok_or(StatusCode::NOT_FOUND)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stocks", get(list_stocks))
        .route("/stocks/export.csv", get(export_stocks))
        .route("/stocks/:ticker", get(get_stock_detail))
        .route("/chat/sessions", post(create_session))
        .route(
            "/chat/sessions/:id",
            get(get_session).delete(close_session),
        )
        .route("/chat/sessions/:id/thinking", put(set_thinking_mode))
        .route("/chat/sessions/:id/messages", post(submit_message))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
struct TableParams {
    sector: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

impl TableParams {
    fn into_query(self, default_page_size: usize) -> Result<TableQuery, StatusCode> {
        let key = match self.sort.as_deref() {
            Some(s) => s.parse::<SortKey>().map_err(|_| StatusCode::BAD_REQUEST)?,
            None => SortKey::Rank,
        };
        let direction = match self.direction.as_deref() {
            Some(s) => s
                .parse::<SortDirection>()
                .map_err(|_| StatusCode::BAD_REQUEST)?,
            None => SortDirection::Asc,
        };

        Ok(TableQuery {
            sector: SectorFilter::parse(self.sector.as_deref().unwrap_or_default()),
            search: self.search.unwrap_or_default(),
            sort: SortState::new(key, direction),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size).max(1),
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiTablePage {
    rows: Vec<StockRecord>,
    page: usize,
    page_size: usize,
    total_pages: usize,
    total_filtered: usize,
    sort: SortState,
    sector: String,
    search: String,
    sectors: Vec<String>,
}

async fn list_stocks(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<Json<ApiTablePage>, StatusCode> {
    let query = params.into_query(state.page_size)?;
    let records = state.store.stocks();
    let page = table::query(records, &query);

    Ok(Json(ApiTablePage {
        rows: page.rows.into_iter().cloned().collect(),
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
        total_filtered: page.total_filtered,
        sort: page.sort,
        sector: query.sector.label().to_string(),
        search: query.search.clone(),
        sectors: table::sectors(records),
    }))
}

async fn export_stocks(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let query = params.into_query(state.page_size)?;
    let body = export_csv(state.store.stocks(), &query).map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "csv export failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"stocks.csv\""),
        ],
        body,
    ))
}

async fn get_stock_detail(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let detail = StockDetail::project(&state.store, &ticker).ok_or(StatusCode::NOT_FOUND)?;
    let value = serde_json::to_value(&detail).map_err(|e| {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(value))
}

#[derive(Debug, Serialize)]
struct ApiSession {
    session_id: Uuid,
    #[serde(flatten)]
    snapshot: SessionSnapshot,
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<ApiSession>) {
    let panel = ChatPanel::open(state.collaborator.clone());
    let snapshot = panel.snapshot().await;
    let session_id = state.sessions.open(panel).await;

    tracing::info!(%session_id, "chat session opened");
    (
        StatusCode::CREATED,
        Json(ApiSession {
            session_id,
            snapshot,
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiSession>, StatusCode> {
    let panel = state.panel(session_id).await?;
    Ok(Json(ApiSession {
        session_id,
        snapshot: panel.snapshot().await,
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    if !state.sessions.close(session_id).await {
        return StatusCode::NOT_FOUND;
    }
    tracing::info!(%session_id, "chat session closed");
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct ThinkingBody {
    enabled: bool,
}

async fn set_thinking_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<ThinkingBody>,
) -> Result<StatusCode, StatusCode> {
    let panel = state.panel(session_id).await?;
    panel.set_thinking_mode(body.enabled).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    text: String,
    #[serde(default)]
    thinking: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ApiTurn {
    user_message_id: MessageId,
    reply_id: MessageId,
}

async fn submit_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<SubmitBody>,
) -> Result<Response, StatusCode> {
    let panel = state.panel(session_id).await?;

    if body.text.trim().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let mode = body.thinking.map(TurnMode::from_thinking);
    let Some(turn) = panel.begin_with_mode(&body.text, mode).await else {
        return Err(StatusCode::CONFLICT);
    };

    let receipt = ApiTurn {
        user_message_id: turn.user_id,
        reply_id: turn.reply_id,
    };
    tokio::spawn(async move {
        let outcome = panel.drive(turn).await;
        tracing::info!(%session_id, ?outcome, "chat turn finished");
    });

    Ok((StatusCode::ACCEPTED, Json(receipt)).into_response())
}
