//! Request and response types for API endpoints

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::news::Article;
use crate::storage::{ListParams, SortDirection};

use super::error::ApiError;

/// Reserved list query keys; every other key is an equality filter
const PAGING_KEYS: [&str; 4] = ["order_by", "direction", "limit", "offset"];

/// Build list parameters from raw query-string pairs
pub fn list_params(query: HashMap<String, String>) -> Result<ListParams, ApiError> {
    let parse_int = |key: &str| -> Result<Option<i64>, ApiError> {
        query
            .get(key)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::bad_request(format!("Query parameter '{}' must be an integer", key)))
            })
            .transpose()
    };

    let limit = parse_int("limit")?;
    let offset = parse_int("offset")?;
    let direction = query
        .get("direction")
        .map(|d| d.parse::<SortDirection>())
        .transpose()?;
    let order_by = query.get("order_by").filter(|s| !s.is_empty()).cloned();

    let mut filters: Vec<(String, String)> = query
        .into_iter()
        .filter(|(key, _)| !PAGING_KEYS.contains(&key.as_str()))
        .collect();
    filters.sort();

    Ok(ListParams {
        order_by,
        direction,
        filters,
        limit,
        offset,
    })
}

/// Query parameters accepted by list endpoints (documentation only)
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Column to sort by (entity default order otherwise)
    #[param(example = "created_at")]
    pub order_by: Option<String>,
    /// asc or desc (default desc)
    #[param(example = "desc")]
    pub direction: Option<String>,
    #[param(example = 50)]
    pub limit: Option<i64>,
    #[param(example = 0)]
    pub offset: Option<i64>,
}

/// Query parameters for the live news endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewsQuery {
    /// Maximum number of articles (default 30)
    #[param(example = 30)]
    pub limit: Option<usize>,
}

/// `{data: ...}` envelope
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// `{status, data}` envelope for mutations
#[derive(Serialize)]
pub struct MutationResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> MutationResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// Response for a created record
#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    #[schema(example = "success")]
    pub status: String,
    #[schema(example = 1)]
    pub id: i64,
}

/// Response for a delete request
#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "success")]
    pub status: String,
    /// Whether a record was removed
    pub deleted: bool,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Recon campaign start request
#[derive(Deserialize, ToSchema)]
pub struct StartReconRequest {
    #[schema(example = "example.com")]
    pub target_domain: String,
    #[schema(example = "medium")]
    pub scope_size: Option<String>,
    #[schema(example = "default")]
    pub script_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StartReconResponse {
    #[schema(example = "success")]
    pub status: String,
    pub campaign_id: i64,
}

/// Checklist import request
#[derive(Deserialize, ToSchema)]
pub struct ImportChecklistRequest {
    #[schema(example = "https://raw.githubusercontent.com/example/checklist/main/README.md")]
    pub url: String,
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportChecklistResponse {
    #[schema(example = "imported")]
    pub status: String,
    pub id: i64,
    pub items: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "uploaded")]
    pub status: String,
    pub id: i64,
    #[schema(example = "./uploads/attack_scripts/enum.sh")]
    pub file_path: String,
}

#[derive(Serialize, ToSchema)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
}

#[derive(Serialize, ToSchema)]
pub struct NewsRefreshResponse {
    #[schema(example = "success")]
    pub status: String,
    /// Articles fetched from the feed
    pub count: usize,
    /// Articles not already stored
    pub stored: usize,
}

/// Version info response (build-time information)
#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = "0.1.0")]
    pub version: String,
    #[schema(example = "abc1234")]
    pub commit: String,
    #[schema(example = "2026-01-11T00:00:00Z")]
    pub build_date: String,
    #[schema(example = "1.88.0")]
    pub rust_version: String,
    #[schema(example = "stable")]
    pub rust_channel: String,
    #[schema(example = "x86_64-unknown-linux-gnu")]
    pub platform: String,
    #[schema(example = "19.1")]
    pub llvm_version: String,
}

/// Server status response (runtime information)
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "workstation")]
    pub hostname: String,
    #[schema(example = "2h 30m 15s")]
    pub uptime: String,
    #[schema(example = "3.46.0")]
    pub sqlite_version: String,
    #[schema(example = "1.50 MB")]
    pub db_size: String,
    pub db_size_bytes: u64,
    /// Whether news comes from the remote feed
    pub news_live: bool,
    /// Bug reports stored
    pub bug_reports: i64,
}

/// Configuration item with env var name
#[derive(Serialize, ToSchema)]
pub struct ConfigItem {
    #[schema(example = "SERVER_PORT")]
    pub env: String,
    #[schema(example = "5000")]
    pub value: String,
}

impl ConfigItem {
    pub fn new(env: &str, value: impl ToString) -> Self {
        Self {
            env: env.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConfigResponse {
    pub items: Vec<ConfigItem>,
}
