//! Entity records and their table descriptors

use rusqlite::Row;
use serde::Serialize;
use utoipa::ToSchema;

use super::schema::{ColumnDef, DefaultValue, SortDirection, TableSchema};

/// A record type stored in one table and readable from a `SELECT *` row
pub trait Entity: Serialize + Send + Sized + 'static {
    const SCHEMA: &'static TableSchema;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

const NEWEST_FIRST: &[(&str, SortDirection)] = &[("created_at", SortDirection::Desc)];

// ============================================
// Row helpers (tolerate NULLs left by older schemas)
// ============================================

fn text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}

fn int_or(row: &Row<'_>, column: &str, default: i64) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(column)?.unwrap_or(default))
}

fn real_or(row: &Row<'_>, column: &str, default: f64) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(column)?.unwrap_or(default))
}

fn list(row: &Row<'_>, column: &str) -> rusqlite::Result<Vec<String>> {
    Ok(parse_list(row.get::<_, Option<String>>(column)?.as_deref()))
}

/// Parse a stored list column.
///
/// Accepts a JSON array of strings; anything else is treated as a
/// comma-separated list.
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => items,
        Err(_) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

// ============================================
// Platform
// ============================================

/// Bug bounty platform
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Platform {
    pub id: i64,
    #[schema(example = "HackerOne")]
    pub name: String,
    #[schema(example = "https://hackerone.com")]
    pub url: Option<String>,
    /// public, private or vdp
    #[schema(example = "public")]
    pub platform_type: Option<String>,
    pub api_key: Option<String>,
    /// 1 when active, 0 otherwise
    #[schema(example = 1)]
    pub is_active: i64,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for Platform {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "platforms",
        entity: "Platform",
        columns: &[
            ColumnDef::text("name").required(),
            ColumnDef::text("url"),
            ColumnDef::text("platform_type").default(DefaultValue::Text("public")),
            ColumnDef::text("api_key"),
            ColumnDef::flag("is_active").default(DefaultValue::Integer(1)),
            ColumnDef::text("description"),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: text(row, "name")?,
            url: row.get("url")?,
            platform_type: row.get("platform_type")?,
            api_key: row.get("api_key")?,
            is_active: int_or(row, "is_active", 1)?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Bug report
// ============================================

/// Bug report submitted (or drafted) for a program
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BugReport {
    pub id: i64,
    #[schema(example = "XSS in login")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "high")]
    pub severity: Option<String>,
    /// Free text, e.g. draft, submitted, triaged, resolved, bounty_awarded
    #[schema(example = "draft")]
    pub status: Option<String>,
    #[schema(example = "xss")]
    pub vulnerability_type: Option<String>,
    pub target_url: Option<String>,
    /// Platform name (not enforced against the platforms table)
    pub platform: Option<String>,
    pub program_name: Option<String>,
    #[schema(example = 500.0)]
    pub bounty_amount: f64,
    pub poc_steps: Option<String>,
    pub impact_description: Option<String>,
    pub remediation_suggestion: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for BugReport {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "bug_reports",
        entity: "Bug report",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("description"),
            ColumnDef::text("severity").default(DefaultValue::Text("medium")),
            ColumnDef::text("status").default(DefaultValue::Text("draft")),
            ColumnDef::text("vulnerability_type"),
            ColumnDef::text("target_url"),
            ColumnDef::text("platform"),
            ColumnDef::text("program_name"),
            ColumnDef::real("bounty_amount").default(DefaultValue::Real(0.0)),
            ColumnDef::text("poc_steps"),
            ColumnDef::text("impact_description"),
            ColumnDef::text("remediation_suggestion"),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            description: row.get("description")?,
            severity: row.get("severity")?,
            status: row.get("status")?,
            vulnerability_type: row.get("vulnerability_type")?,
            target_url: row.get("target_url")?,
            platform: row.get("platform")?,
            program_name: row.get("program_name")?,
            bounty_amount: real_or(row, "bounty_amount", 0.0)?,
            poc_steps: row.get("poc_steps")?,
            impact_description: row.get("impact_description")?,
            remediation_suggestion: row.get("remediation_suggestion")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Bounty target
// ============================================

/// Earnings goal tracked toward a target amount
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BountyTarget {
    pub id: i64,
    #[schema(example = "Q4 bounty goal")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 5000.0)]
    pub target_amount: Option<f64>,
    pub current_amount: f64,
    #[schema(example = "2026-12-31")]
    pub deadline: Option<String>,
    pub is_active: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for BountyTarget {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "bounty_targets",
        entity: "Bounty target",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("description"),
            ColumnDef::real("target_amount"),
            ColumnDef::real("current_amount").default(DefaultValue::Real(0.0)),
            ColumnDef::text("deadline"),
            ColumnDef::flag("is_active").default(DefaultValue::Integer(1)),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            description: row.get("description")?,
            target_amount: row.get("target_amount")?,
            current_amount: real_or(row, "current_amount", 0.0)?,
            deadline: row.get("deadline")?,
            is_active: int_or(row, "is_active", 1)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Security checklist
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SecurityChecklist {
    pub id: i64,
    #[schema(example = "OWASP WSTG")]
    pub name: String,
    /// Checklist category, e.g. web, api, mobile
    #[serde(rename = "type")]
    #[schema(example = "web")]
    pub checklist_type: Option<String>,
    pub description: Option<String>,
    /// Audit steps
    pub items: Vec<String>,
    /// Completion percentage
    pub progress: i64,
    pub source_url: Option<String>,
    pub is_template: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for SecurityChecklist {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "security_checklists",
        entity: "Checklist",
        columns: &[
            ColumnDef::text("name").required(),
            ColumnDef::text("type").default(DefaultValue::Text("web")),
            ColumnDef::text("description"),
            ColumnDef::list("items"),
            ColumnDef::integer("progress").default(DefaultValue::Integer(0)),
            ColumnDef::text("source_url"),
            ColumnDef::flag("is_template").default(DefaultValue::Integer(0)),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: text(row, "name")?,
            checklist_type: row.get("type")?,
            description: row.get("description")?,
            items: list(row, "items")?,
            progress: int_or(row, "progress", 0)?,
            source_url: row.get("source_url")?,
            is_template: int_or(row, "is_template", 0)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Tip
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Tip {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    #[schema(example = "general")]
    pub category: Option<String>,
    #[schema(example = "beginner")]
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for Tip {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "tips",
        entity: "Tip",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("content"),
            ColumnDef::text("category").default(DefaultValue::Text("general")),
            ColumnDef::text("difficulty").default(DefaultValue::Text("beginner")),
            ColumnDef::list("tags"),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            content: row.get("content")?,
            category: row.get("category")?,
            difficulty: row.get("difficulty")?,
            tags: list(row, "tags")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Reading list
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadingItem {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    #[schema(example = "article")]
    pub category: Option<String>,
    pub is_read: i64,
    pub priority: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for ReadingItem {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "reading_list",
        entity: "Reading item",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("url"),
            ColumnDef::text("description"),
            ColumnDef::text("category").default(DefaultValue::Text("article")),
            ColumnDef::flag("is_read").default(DefaultValue::Integer(0)),
            ColumnDef::integer("priority").default(DefaultValue::Integer(1)),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            url: row.get("url")?,
            description: row.get("description")?,
            category: row.get("category")?,
            is_read: int_or(row, "is_read", 0)?,
            priority: int_or(row, "priority", 1)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Useful link
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsefulLink {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    #[schema(example = "tools")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for UsefulLink {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "useful_links",
        entity: "Link",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("url").required(),
            ColumnDef::text("description"),
            ColumnDef::text("category").default(DefaultValue::Text("tools")),
            ColumnDef::list("tags"),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            url: text(row, "url")?,
            description: row.get("description")?,
            category: row.get("category")?,
            tags: list(row, "tags")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Stored news article
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NewsArticle {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub published_date: Option<String>,
    pub is_read: i64,
    pub is_favorite: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for NewsArticle {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "news_articles",
        entity: "News article",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("content"),
            ColumnDef::text("url"),
            ColumnDef::text("source"),
            ColumnDef::text("category"),
            ColumnDef::text("published_date"),
            ColumnDef::flag("is_read").default(DefaultValue::Integer(0)),
            ColumnDef::flag("is_favorite").default(DefaultValue::Integer(0)),
        ],
        default_order: &[
            ("published_date", SortDirection::Desc),
            ("created_at", SortDirection::Desc),
        ],
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            content: row.get("content")?,
            url: row.get("url")?,
            source: row.get("source")?,
            category: row.get("category")?,
            published_date: row.get("published_date")?,
            is_read: int_or(row, "is_read", 0)?,
            is_favorite: int_or(row, "is_favorite", 0)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Personal note
// ============================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    #[schema(example = "general")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for Note {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "personal_notes",
        entity: "Note",
        columns: &[
            ColumnDef::text("title").required(),
            ColumnDef::text("content"),
            ColumnDef::text("category").default(DefaultValue::Text("general")),
            ColumnDef::list("tags"),
            ColumnDef::flag("is_pinned").default(DefaultValue::Integer(0)),
        ],
        default_order: &[
            ("is_pinned", SortDirection::Desc),
            ("created_at", SortDirection::Desc),
        ],
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: text(row, "title")?,
            content: row.get("content")?,
            category: row.get("category")?,
            tags: list(row, "tags")?,
            is_pinned: int_or(row, "is_pinned", 0)? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Recon campaign
// ============================================

/// Bookkeeping record of an intended reconnaissance run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReconCampaign {
    pub id: i64,
    #[schema(example = "example.com")]
    pub target_domain: String,
    /// Advisory only, e.g. pending, running, stopped
    #[schema(example = "running")]
    pub status: Option<String>,
    pub subdomain_count: i64,
    pub live_host_count: i64,
    #[schema(example = "medium")]
    pub scope_size: Option<String>,
    #[schema(example = "default")]
    pub script_name: Option<String>,
    pub log_path: Option<String>,
    pub is_stopped: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Entity for ReconCampaign {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recon_campaigns",
        entity: "Campaign",
        columns: &[
            ColumnDef::text("target_domain").required(),
            ColumnDef::text("status").default(DefaultValue::Text("pending")),
            ColumnDef::integer("subdomain_count").default(DefaultValue::Integer(0)),
            ColumnDef::integer("live_host_count").default(DefaultValue::Integer(0)),
            ColumnDef::text("scope_size").default(DefaultValue::Text("medium")),
            ColumnDef::text("script_name"),
            ColumnDef::text("log_path"),
            ColumnDef::flag("is_stopped").default(DefaultValue::Integer(0)),
        ],
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            target_domain: text(row, "target_domain")?,
            status: row.get("status")?,
            subdomain_count: int_or(row, "subdomain_count", 0)?,
            live_host_count: int_or(row, "live_host_count", 0)?,
            scope_size: row.get("scope_size")?,
            script_name: row.get("script_name")?,
            log_path: row.get("log_path")?,
            is_stopped: int_or(row, "is_stopped", 0)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================
// Attack / exploit scripts
// ============================================

/// Uploaded script file reference; never executed by the dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Script {
    pub id: i64,
    pub name: String,
    #[schema(example = "subdomain_takeover.sh")]
    pub filename: Option<String>,
    #[schema(example = "bash")]
    pub language: Option<String>,
    pub description: Option<String>,
    pub file_path: Option<String>,
    #[schema(example = "ready")]
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

const SCRIPT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::text("name").required(),
    ColumnDef::text("filename"),
    ColumnDef::text("language").default(DefaultValue::Text("bash")),
    ColumnDef::text("description"),
    ColumnDef::text("file_path"),
    ColumnDef::text("status").default(DefaultValue::Text("ready")),
];

impl Script {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: text(row, "name")?,
            filename: row.get("filename")?,
            language: row.get("language")?,
            description: row.get("description")?,
            file_path: row.get("file_path")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AttackScript(pub Script);

impl Entity for AttackScript {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "attack_scripts",
        entity: "Attack script",
        columns: SCRIPT_COLUMNS,
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Script::from_row(row).map(Self)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ExploitScript(pub Script);

impl Entity for ExploitScript {
    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "exploit_scripts",
        entity: "Exploit script",
        columns: SCRIPT_COLUMNS,
        default_order: NEWEST_FIRST,
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Script::from_row(row).map(Self)
    }
}

/// Every table managed by the dashboard, in creation order
pub const ALL_TABLES: &[&TableSchema] = &[
    Platform::SCHEMA,
    BugReport::SCHEMA,
    BountyTarget::SCHEMA,
    SecurityChecklist::SCHEMA,
    Tip::SCHEMA,
    ReadingItem::SCHEMA,
    UsefulLink::SCHEMA,
    NewsArticle::SCHEMA,
    Note::SCHEMA,
    ReconCampaign::SCHEMA,
    AttackScript::SCHEMA,
    ExploitScript::SCHEMA,
];
