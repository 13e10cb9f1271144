//! Web layer for the bounty dashboard
//!
//! This module provides the HTTP server, API endpoints and the embedded UI.
//!
//! # Module Structure
//! - `handlers`: HTTP request handlers
//! - `state`: Application state and runtime info
//! - `types`: Request and response types
//! - `error`: API error to HTTP response mapping
//! - `docs`: OpenAPI paths for the generic record and script routes

mod docs;
mod error;
mod handlers;
mod state;
mod types;

// Re-export public types
pub use error::ApiError;
pub use handlers::{
    create_entity, delete_entity, get_config, get_dashboard_stats, get_entity, get_news,
    get_status, get_version, healthz, import_checklist, list_campaigns, list_entities,
    list_saved_news, refresh_news, start_recon, stop_campaign, update_entity,
};
pub use state::{AppState, ConfigInfo, RuntimeInfo, format_uptime};
pub use types::{
    ConfigItem, ConfigResponse, CreatedResponse, DataResponse, DeleteResponse, ErrorResponse,
    HealthResponse, ImportChecklistRequest, ImportChecklistResponse, ListQuery,
    MutationResponse, NewsQuery, NewsRefreshResponse, NewsResponse, StartReconRequest,
    StartReconResponse, StatusResponse, UploadResponse, VersionResponse, list_params,
};

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{Method, StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, patch, post},
};
use rust_embed::Embed;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;

use crate::config::Config;
use crate::news::Article;
use crate::storage::models::{
    BountyTarget, BugReport, NewsArticle, Note, Platform, ReadingItem, ReconCampaign, Script,
    SecurityChecklist, Tip, UsefulLink,
};
use crate::storage::{DashboardStats, Database, Entity};
use crate::uploads::ScriptKind;
use docs::RecordPaths;

/// Upper bound for uploaded script bodies
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bounty Dashboard API",
        description = "Local bug bounty tracking dashboard API",
        version = env!("CARGO_PKG_VERSION"),
        license(name = "MIT")
    ),
    paths(
        handlers::healthz,
        handlers::get_dashboard_stats,
        handlers::get_version,
        handlers::get_status,
        handlers::get_config,
        handlers::import_checklist,
        handlers::list_campaigns,
        handlers::start_recon,
        handlers::stop_campaign,
        handlers::get_news,
        handlers::refresh_news,
        handlers::list_saved_news,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        CreatedResponse,
        DeleteResponse,
        DashboardStats,
        VersionResponse,
        StatusResponse,
        ConfigResponse,
        ConfigItem,
        ImportChecklistRequest,
        ImportChecklistResponse,
        StartReconRequest,
        StartReconResponse,
        UploadResponse,
        NewsResponse,
        NewsRefreshResponse,
        Article,
        Platform,
        BugReport,
        BountyTarget,
        SecurityChecklist,
        Tip,
        ReadingItem,
        UsefulLink,
        NewsArticle,
        Note,
        ReconCampaign,
        Script,
    )),
    modifiers(&RecordPaths),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Dashboard", description = "Dashboard summary endpoints"),
        (name = "Platforms", description = "Bug bounty platform records"),
        (name = "Bugs", description = "Bug report records"),
        (name = "Targets", description = "Bounty target records"),
        (name = "Checklists", description = "Security checklist endpoints"),
        (name = "Tips", description = "Tip records"),
        (name = "Reading", description = "Reading list records"),
        (name = "Links", description = "Useful link records"),
        (name = "Notes", description = "Note records"),
        (name = "Scripts", description = "Attack and exploit script uploads"),
        (name = "Recon", description = "Recon campaign bookkeeping endpoints"),
        (name = "News", description = "Security news endpoints"),
        (name = "Version", description = "Build version information endpoints"),
        (name = "Status", description = "Server runtime status endpoints"),
        (name = "Config", description = "Configuration endpoints"),
    )
)]
pub struct ApiDoc;

#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// Collection and item routes for one entity: `GET/POST {base}` and
/// `GET/PUT/DELETE {base}/{id}`
fn entity_routes<E: Entity>(router: Router<AppState>, base: &str) -> Router<AppState> {
    router
        .route(
            base,
            get(handlers::list_entities::<E>).post(handlers::create_entity::<E>),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(handlers::get_entity::<E>)
                .put(handlers::update_entity::<E>)
                .delete(handlers::delete_entity::<E>),
        )
}

/// `PATCH {path}` flipping `column` of entity `E`; `path` must contain `{id}`
fn toggle_route<E: Entity>(router: Router<AppState>, path: &str, column: &'static str) -> Router<AppState> {
    router.route(
        path,
        patch(move |State(state): State<AppState>, Path(id): Path<i64>| {
            handlers::toggle_entity::<E>(state, id, column)
        }),
    )
}

/// Upload, list, stop and delete routes for one script kind; delete is served
/// under both `/scripts/{id}` and `/{id}`
fn script_routes(kind: ScriptKind) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(move |State(state): State<AppState>, multipart: Multipart| {
                handlers::upload_script(state, kind, multipart)
            })
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/scripts",
            get(
                move |State(state): State<AppState>,
                      Query(query): Query<HashMap<String, String>>| {
                    handlers::list_scripts(state, kind, query)
                },
            ),
        )
        .route(
            "/scripts/{id}",
            axum::routing::delete(move |State(state): State<AppState>, Path(id): Path<i64>| {
                handlers::delete_script(state, kind, id)
            }),
        )
        .route(
            "/{id}",
            axum::routing::delete(move |State(state): State<AppState>, Path(id): Path<i64>| {
                handlers::delete_script(state, kind, id)
            }),
        )
        .route(
            "/{id}/stop",
            patch(move |State(state): State<AppState>, Path(id): Path<i64>| {
                handlers::stop_script(state, kind, id)
            }),
        )
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);

    let mut api = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/dashboard/stats", get(get_dashboard_stats))
        .route("/api/checklists/import", post(import_checklist))
        .route("/api/recon/campaigns", get(list_campaigns))
        .route("/api/recon/start", post(start_recon))
        .route(
            "/api/campaigns/{id}",
            get(handlers::get_entity::<ReconCampaign>)
                .delete(handlers::delete_entity::<ReconCampaign>),
        )
        .route("/api/campaigns/{id}/stop", patch(stop_campaign))
        .route("/api/news", get(get_news))
        .route("/api/news/refresh", post(refresh_news))
        .route("/api/news/saved", get(list_saved_news))
        .route(
            "/api/news/saved/{id}",
            get(handlers::get_entity::<NewsArticle>)
                .delete(handlers::delete_entity::<NewsArticle>),
        )
        .route("/api/version", get(get_version))
        .route("/api/status", get(get_status))
        .route("/api/config", get(get_config));

    api = entity_routes::<Platform>(api, "/api/platforms");
    api = entity_routes::<BugReport>(api, "/api/bugs");
    api = entity_routes::<BountyTarget>(api, "/api/targets");
    api = entity_routes::<SecurityChecklist>(api, "/api/checklists");
    api = entity_routes::<Tip>(api, "/api/tips");
    api = entity_routes::<ReadingItem>(api, "/api/reading");
    api = entity_routes::<UsefulLink>(api, "/api/links");
    api = entity_routes::<Note>(api, "/api/notes");

    api = toggle_route::<Platform>(api, "/api/platforms/{id}/toggle-active", "is_active");
    api = toggle_route::<BountyTarget>(api, "/api/targets/{id}/toggle-active", "is_active");
    api = toggle_route::<ReadingItem>(api, "/api/reading/{id}/toggle-read", "is_read");
    api = toggle_route::<Note>(api, "/api/notes/{id}/toggle-pin", "is_pinned");
    api = toggle_route::<NewsArticle>(api, "/api/news/saved/{id}/toggle-read", "is_read");
    api = toggle_route::<NewsArticle>(api, "/api/news/saved/{id}/toggle-favorite", "is_favorite");

    api.nest("/api/attack", script_routes(ScriptKind::Attack))
        .nest("/api/exploit", script_routes(ScriptKind::Exploit))
        // OpenAPI documentation
        .route("/api-docs/openapi.json", get(serve_openapi))
        // Static files and UI
        .route("/", get(serve_index))
        .route("/static/{*path}", get(serve_static))
        .route("/style.css", get(serve_css))
        .route("/app.js", get(serve_js))
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: Config, mut shutdown: tokio::sync::watch::Receiver<bool>) -> Result<()> {
    info!(
        bind_address = %config.bind_address,
        port = config.server_port,
        storage_path = %config.storage_path,
        upload_dir = %config.upload_dir,
        news_enabled = config.news_enabled,
        "Starting dashboard server"
    );

    let db = Database::new(&config.get_db_path())?;
    let state = AppState::from_config(&config, db)?;
    let app = router(state);

    let ip: IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.server_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("Server shutting down");
        })
        .await?;

    Ok(())
}

async fn serve_index() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(
            std::str::from_utf8(content.data.as_ref())
                .unwrap_or("")
                .to_string(),
        )
        .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn serve_css() -> impl IntoResponse {
    serve_asset("style.css")
}

async fn serve_js() -> impl IntoResponse {
    serve_asset("app.js")
}

async fn serve_static(Path(path): Path<String>) -> impl IntoResponse {
    serve_asset(path.trim_start_matches('/'))
}

fn serve_asset(path: &str) -> axum::response::Response {
    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn serve_openapi() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        ApiDoc::openapi().to_json().unwrap_or_default(),
    )
}
