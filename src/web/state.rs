//! Application state shared across handlers

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::checklist::ChecklistImporter;
use crate::config::Config;
use crate::news::{NewsFeed, RssSource};
use crate::storage::Database;
use crate::uploads::ScriptStore;

/// Configuration snapshot exposed by `/api/config`
#[derive(Debug, Clone)]
pub struct ConfigInfo {
    pub log_format: String,
    pub log_level: String,
    pub bind_address: String,
    pub server_port: u16,
    pub storage_path: String,
    pub upload_dir: String,
    pub news_enabled: bool,
    pub news_feed_url: String,
    pub news_timeout_secs: u64,
}

impl From<&Config> for ConfigInfo {
    fn from(config: &Config) -> Self {
        Self {
            log_format: config.log_format.clone(),
            log_level: config.log_level.clone(),
            bind_address: config.bind_address.clone(),
            server_port: config.server_port,
            storage_path: config.storage_path.clone(),
            upload_dir: config.upload_dir.clone(),
            news_enabled: config.news_enabled,
            news_feed_url: config.news_feed_url.clone(),
            news_timeout_secs: config.news_timeout_secs,
        }
    }
}

/// Process information for `/api/status`
#[derive(Debug)]
pub struct RuntimeInfo {
    pub hostname: String,
    started_at: Instant,
}

impl RuntimeInfo {
    pub fn new() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            hostname,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn uptime_string(&self) -> String {
        format_uptime(self.uptime_secs())
    }
}

impl Default for RuntimeInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Format seconds as e.g. "1d 2h 3m 4s", omitting leading zero units
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub news: NewsFeed,
    pub importer: ChecklistImporter,
    pub scripts: ScriptStore,
    pub config: Arc<ConfigInfo>,
    pub runtime: Arc<RuntimeInfo>,
}

impl AppState {
    /// Wire the state for `config` around an opened database
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let news = if config.news_enabled {
            info!(url = %config.news_feed_url, "News feed enabled");
            NewsFeed::new(Arc::new(RssSource::new(
                config.news_feed_url.clone(),
                config.news_timeout_secs,
            )?))
        } else {
            info!("News feed disabled, serving placeholder articles");
            NewsFeed::disabled()
        };

        Ok(Self {
            db: Arc::new(db),
            news,
            importer: ChecklistImporter::new(config.news_timeout_secs)?,
            scripts: ScriptStore::new(&config.upload_dir),
            config: Arc::new(ConfigInfo::from(config)),
            runtime: Arc::new(RuntimeInfo::new()),
        })
    }
}
