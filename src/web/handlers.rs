//! HTTP request handlers for API endpoints

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::env;
use crate::news::DEFAULT_NEWS_LIMIT;
use crate::storage::models::{NewsArticle, ReconCampaign};
use crate::storage::{DashboardStats, Entity, Fields, ListParams};
use crate::uploads::{ScriptKind, UploadMeta};

use super::error::ApiError;
use super::state::AppState;
use super::types::{
    ConfigItem, ConfigResponse, CreatedResponse, DataResponse, DeleteResponse, HealthResponse,
    ImportChecklistRequest, ImportChecklistResponse, ListQuery, MutationResponse, NewsQuery,
    NewsRefreshResponse, NewsResponse, StartReconRequest, StartReconResponse, StatusResponse,
    UploadResponse, VersionResponse, list_params,
};

type ApiResult<T> = Result<T, ApiError>;

fn object(body: Value) -> ApiResult<Fields> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

// ============================================
// Generic entity handlers
// ============================================

pub async fn list_entities<E: Entity>(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<DataResponse<Vec<E>>>> {
    let params = list_params(query)?;
    let data = state.db.list::<E>(&params)?;
    debug!(table = E::SCHEMA.table, count = data.len(), "Listed records");
    Ok(Json(DataResponse { data }))
}

pub async fn get_entity<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DataResponse<E>>> {
    let data = state.db.read::<E>(id)?;
    Ok(Json(DataResponse { data }))
}

pub async fn create_entity<E: Entity>(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.db.create::<E>(&object(body)?)?;
    info!(table = E::SCHEMA.table, id = id, "Record created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            status: "success".to_string(),
            id,
        }),
    ))
}

pub async fn update_entity<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<Json<MutationResponse<E>>> {
    let data = state.db.update::<E>(id, &object(body)?)?;
    info!(table = E::SCHEMA.table, id = id, "Record updated");
    Ok(Json(MutationResponse::success(data)))
}

pub async fn delete_entity<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.db.delete::<E>(id)?;
    info!(table = E::SCHEMA.table, id = id, deleted = deleted, "Record delete processed");
    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        deleted,
    }))
}

/// Flip a flag column; wired per route with the column name
pub async fn toggle_entity<E: Entity>(
    state: AppState,
    id: i64,
    column: &'static str,
) -> ApiResult<Json<MutationResponse<E>>> {
    let data = state.db.toggle::<E>(id, column)?;
    info!(table = E::SCHEMA.table, id = id, column = column, "Record toggled");
    Ok(Json(MutationResponse::success(data)))
}

// ============================================
// Health, dashboard and server info
// ============================================

/// Liveness check
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Dashboard summary statistics
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard summary; failed metrics are reported as 0", body = DashboardStats)
    )
)]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.db.dashboard_stats())
}

/// Get version info (build-time information)
#[utoipa::path(
    get,
    path = "/api/version",
    tag = "Version",
    responses(
        (status = 200, description = "Version information", body = VersionResponse)
    )
)]
pub async fn get_version() -> impl IntoResponse {
    let version = VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("VERGEN_GIT_SHA").to_string(),
        build_date: env!("VERGEN_BUILD_TIMESTAMP").to_string(),
        rust_version: env!("VERGEN_RUSTC_SEMVER").to_string(),
        rust_channel: env!("VERGEN_RUSTC_CHANNEL").to_string(),
        platform: env!("VERGEN_CARGO_TARGET_TRIPLE").to_string(),
        llvm_version: option_env!("VERGEN_RUSTC_LLVM_VERSION")
            .unwrap_or("unknown")
            .to_string(),
    };
    (StatusCode::OK, Json(version))
}

/// Get server status (runtime information)
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "Status",
    responses(
        (status = 200, description = "Server status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let (db_size_bytes, db_size) = state.db.get_db_size();
    let bug_reports = state
        .db
        .count_rows(crate::storage::models::BugReport::SCHEMA.table)
        .unwrap_or(0);

    let status = StatusResponse {
        hostname: state.runtime.hostname.clone(),
        uptime: state.runtime.uptime_string(),
        sqlite_version: state.db.sqlite_version().to_string(),
        db_size,
        db_size_bytes,
        news_live: state.news.is_live(),
        bug_reports,
    };
    (StatusCode::OK, Json(status))
}

/// Get config info
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    responses(
        (status = 200, description = "Configuration information", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let c = &state.config;

    // ENV names come from crate::config::env
    let items = vec![
        ConfigItem::new(env::LOG_FORMAT, &c.log_format),
        ConfigItem::new(env::LOG_LEVEL, &c.log_level),
        ConfigItem::new(env::BIND_ADDRESS, &c.bind_address),
        ConfigItem::new(env::SERVER_PORT, c.server_port),
        ConfigItem::new(env::STORAGE_PATH, &c.storage_path),
        ConfigItem::new(env::UPLOAD_DIR, &c.upload_dir),
        ConfigItem::new(env::NEWS_ENABLED, c.news_enabled),
        ConfigItem::new(env::NEWS_FEED_URL, &c.news_feed_url),
        ConfigItem::new(env::NEWS_TIMEOUT_SECS, c.news_timeout_secs),
    ];

    (StatusCode::OK, Json(ConfigResponse { items }))
}

// ============================================
// Checklists
// ============================================

/// Import a markdown checklist from a URL
#[utoipa::path(
    post,
    path = "/api/checklists/import",
    tag = "Checklists",
    request_body = ImportChecklistRequest,
    responses(
        (status = 201, description = "Checklist imported", body = ImportChecklistResponse),
        (status = 400, description = "Missing url", body = super::types::ErrorResponse)
    )
)]
pub async fn import_checklist(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<ImportChecklistResponse>)> {
    let fields = object(body)?;
    let url = fields
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Missing required field: url"))?;
    let name = fields.get("name").and_then(Value::as_str);

    let imported = state.importer.import(&state.db, url, name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ImportChecklistResponse {
            status: "imported".to_string(),
            id: imported.id,
            items: imported.items,
        }),
    ))
}

// ============================================
// Recon campaigns
// ============================================

/// List recon campaigns
#[utoipa::path(
    get,
    path = "/api/recon/campaigns",
    tag = "Recon",
    params(ListQuery),
    responses(
        (status = 200, description = "Campaigns, newest first", body = Vec<ReconCampaign>)
    )
)]
pub async fn list_campaigns(
    state: State<AppState>,
    query: Query<HashMap<String, String>>,
) -> ApiResult<Json<DataResponse<Vec<ReconCampaign>>>> {
    list_entities::<ReconCampaign>(state, query).await
}

/// Record a recon campaign as running. No tooling is launched.
#[utoipa::path(
    post,
    path = "/api/recon/start",
    tag = "Recon",
    request_body = StartReconRequest,
    responses(
        (status = 200, description = "Campaign recorded", body = StartReconResponse),
        (status = 400, description = "Missing target domain", body = super::types::ErrorResponse)
    )
)]
pub async fn start_recon(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<StartReconResponse>> {
    let mut fields = object(body)?;
    fields.insert("status".into(), Value::String("running".into()));
    if fields.get("script_name").is_none_or(Value::is_null) {
        fields.insert("script_name".into(), Value::String("default".into()));
    }

    let campaign_id = state.db.create::<ReconCampaign>(&fields)?;
    info!(id = campaign_id, "Recon campaign recorded");

    Ok(Json(StartReconResponse {
        status: "success".to_string(),
        campaign_id,
    }))
}

/// Mark a campaign as stopped
#[utoipa::path(
    patch,
    path = "/api/campaigns/{id}/stop",
    tag = "Recon",
    params(("id" = i64, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign stopped", body = ReconCampaign),
        (status = 404, description = "Unknown campaign", body = super::types::ErrorResponse)
    )
)]
pub async fn stop_campaign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MutationResponse<ReconCampaign>>> {
    let mut fields = Fields::new();
    fields.insert("status".into(), Value::String("stopped".into()));
    fields.insert("is_stopped".into(), Value::Bool(true));

    let data = state.db.update::<ReconCampaign>(id, &fields)?;
    info!(id = id, "Recon campaign stopped");
    Ok(Json(MutationResponse::success(data)))
}

// ============================================
// News
// ============================================

/// Latest articles from the feed, or placeholders when it is unavailable
#[utoipa::path(
    get,
    path = "/api/news",
    tag = "News",
    params(NewsQuery),
    responses(
        (status = 200, description = "Latest articles", body = NewsResponse)
    )
)]
pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<NewsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_NEWS_LIMIT);
    Json(NewsResponse {
        articles: state.news.latest(limit).await,
    })
}

/// Fetch the feed and store new articles
#[utoipa::path(
    post,
    path = "/api/news/refresh",
    tag = "News",
    responses(
        (status = 200, description = "Feed refreshed", body = NewsRefreshResponse)
    )
)]
pub async fn refresh_news(State(state): State<AppState>) -> ApiResult<Json<NewsRefreshResponse>> {
    let articles = state.news.live(DEFAULT_NEWS_LIMIT).await;
    let stored = state.db.insert_news(&articles)?;
    info!(fetched = articles.len(), stored = stored, "News refreshed");

    Ok(Json(NewsRefreshResponse {
        status: "success".to_string(),
        count: articles.len(),
        stored,
    }))
}

/// Stored articles
#[utoipa::path(
    get,
    path = "/api/news/saved",
    tag = "News",
    params(ListQuery),
    responses(
        (status = 200, description = "Stored articles, newest first", body = Vec<NewsArticle>)
    )
)]
pub async fn list_saved_news(
    state: State<AppState>,
    query: Query<HashMap<String, String>>,
) -> ApiResult<Json<DataResponse<Vec<NewsArticle>>>> {
    list_entities::<NewsArticle>(state, query).await
}

// ============================================
// Script uploads
// ============================================

/// Store an uploaded script from a multipart form.
///
/// The file goes in the `script` field; `name`, `language` and `description`
/// are optional text fields.
pub async fn upload_script(
    state: AppState,
    kind: ScriptKind,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut meta = UploadMeta::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "script" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            "name" | "language" | "description" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid form field: {}", e)))?;
                match field_name.as_str() {
                    "name" => meta.name = Some(value),
                    "language" => meta.language = Some(value),
                    _ => meta.description = Some(value),
                }
            }
            other => debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    let (filename, data) =
        file.ok_or_else(|| ApiError::bad_request("Missing file field: script"))?;
    let stored = state
        .scripts
        .save(&state.db, kind, &filename, &data, meta)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            status: "uploaded".to_string(),
            id: stored.id,
            file_path: stored.file_path,
        }),
    ))
}

pub async fn list_scripts(
    state: AppState,
    kind: ScriptKind,
    query: HashMap<String, String>,
) -> ApiResult<Json<DataResponse<Vec<crate::storage::models::Script>>>> {
    let params: ListParams = list_params(query)?;
    let data = state.scripts.list(&state.db, kind, &params)?;
    Ok(Json(DataResponse { data }))
}

pub async fn stop_script(
    state: AppState,
    kind: ScriptKind,
    id: i64,
) -> ApiResult<Json<MutationResponse<crate::storage::models::Script>>> {
    let data = state.scripts.stop(&state.db, kind, id)?;
    info!(kind = kind.as_str(), id = id, "Script marked as stopped");
    Ok(Json(MutationResponse::success(data)))
}

pub async fn delete_script(
    state: AppState,
    kind: ScriptKind,
    id: i64,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.scripts.delete(&state.db, kind, id).await?;
    info!(kind = kind.as_str(), id = id, deleted = deleted, "Script delete processed");
    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        deleted,
    }))
}
