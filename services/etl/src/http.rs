use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use courtsync_common::error::EtlError;
use courtsync_common::types::ServiceInfo;
use courtsync_config::AppConfig;
use courtsync_db::checkpoint::PgCheckpointStore;
use courtsync_db::league::destination::PgDestination;
use courtsync_db::league::source::PgLeagueSource;
use courtsync_db::league::SyncTable;
use courtsync_db::runlog::PgRunLog;
use courtsync_db::{open_pool, RetryPolicy};

use crate::error::ApiError;
use crate::sync::{sync_table, SyncMode, SyncOutcome, SyncStores};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

#[derive(Debug, Deserialize)]
pub struct SyncParams {
    pub scope: Option<String>,
    pub game_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Rows touched per requested table.
    pub updated: BTreeMap<&'static str, usize>,
    pub duration_ms: u64,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("courtsync-etl"))
}

async fn metrics() -> impl IntoResponse {
    let body = "\
# HELP courtsync_up Service up indicator\n\
# TYPE courtsync_up gauge\n\
courtsync_up 1\n\
# HELP courtsync_info Service info\n\
# TYPE courtsync_info gauge\n\
courtsync_info{service=\"courtsync-etl\",version=\"0.1.0\"} 1\n";

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

/// On-demand partial sync, called by the reporting service right
/// before it renders, to shrink staleness. Synchronous: the response
/// carries the per-table row counts of a sync that already happened.
async fn trigger_sync(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, ApiError> {
    // Auth, then scope validation, both before any connection opens.
    authorize(&headers, state.config.sync_token.as_deref())?;
    let tables = parse_scope(params.scope.as_deref())?;

    let started = Instant::now();
    let policy = RetryPolicy {
        max_attempts: state.config.max_retries,
        delay: Duration::from_secs(state.config.retry_delay_secs),
    };

    // Fresh pools, independent of the periodic loop's.
    let source_pool = open_pool("source", &state.config.source_database_url, &policy).await?;
    let dest_pool = match open_pool("destination", &state.config.database_url, &policy).await {
        Ok(pool) => pool,
        Err(e) => {
            source_pool.close().await;
            return Err(e.into());
        }
    };

    let source = PgLeagueSource::new(source_pool.clone());
    let dest = PgDestination::new(dest_pool.clone());
    let checkpoints = PgCheckpointStore::new(dest_pool.clone());
    let audit = PgRunLog::new(dest_pool.clone());
    let stores = SyncStores {
        source: &source,
        dest: &dest,
        checkpoints: &checkpoints,
        audit: &audit,
    };

    let mut outcomes: Vec<SyncOutcome> = Vec::with_capacity(tables.len());
    for table in &tables {
        let mode = match table {
            SyncTable::Games | SyncTable::GameEvents if params.game_id.is_some() => {
                SyncMode::Reconcile(params.game_id.map(|id| vec![id]))
            }
            _ => SyncMode::Incremental,
        };
        outcomes.push(sync_table(&stores, *table, &mode).await);
    }

    source_pool.close().await;
    dest_pool.close().await;

    // A table failure surfaces as a structured error rather than a
    // partial count map; the caller falls back to stale data.
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.is_error())
        .map(|o| o.table.as_str())
        .collect();
    if !failed.is_empty() {
        return Err(EtlError::Internal(format!("sync failed for: {}", failed.join(", "))).into());
    }

    let updated: BTreeMap<&'static str, usize> = outcomes
        .iter()
        .map(|o| (o.table.as_str(), o.count))
        .collect();

    tracing::info!(?updated, game_id = ?params.game_id, "on-demand sync completed");

    Ok(Json(SyncResponse {
        updated,
        duration_ms: started.elapsed().as_millis() as u64,
    }))
}

/// Bearer-token check against the configured secret. Fails closed: no
/// configured token means every request is rejected.
fn authorize(headers: &HeaderMap, configured: Option<&str>) -> Result<(), ApiError> {
    let expected = configured
        .ok_or_else(|| EtlError::Unauthorized("sync token is not configured".to_owned()))?;

    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| EtlError::Unauthorized("missing authorization header".to_owned()))?
        .to_str()
        .map_err(|_| EtlError::Unauthorized("invalid authorization header".to_owned()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| EtlError::Unauthorized("expected a bearer token".to_owned()))?;

    if token != expected {
        return Err(EtlError::Unauthorized("invalid sync token".to_owned()).into());
    }

    Ok(())
}

/// Parse the comma-separated scope list, defaulting to the two tables
/// whose staleness reports actually notice.
fn parse_scope(raw: Option<&str>) -> Result<Vec<SyncTable>, ApiError> {
    let raw = raw.unwrap_or("games,game_events");

    let mut tables = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let table = SyncTable::parse(name)
            .ok_or_else(|| EtlError::Validation(format!("unknown scope name: {name}")))?;
        if !tables.contains(&table) {
            tables.push(table);
        }
    }

    if tables.is_empty() {
        return Err(EtlError::Validation("scope contains no table names".to_owned()).into());
    }

    Ok(tables)
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse::<HeaderValue>().unwrap(),
            "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .route("/v1/sync", post(trigger_sync))
        .layer(cors)
        .with_state(state)
}
