use clap::{ArgAction, Parser, Subcommand};
use std::net::IpAddr;

// ============================================
// Environment variable name constants
// These are shared between config parsing and API exposure
// ============================================
pub mod env {
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const STORAGE_PATH: &str = "STORAGE_PATH";
    pub const UPLOAD_DIR: &str = "UPLOAD_DIR";
    pub const NEWS_ENABLED: &str = "NEWS_ENABLED";
    pub const NEWS_FEED_URL: &str = "NEWS_FEED_URL";
    pub const NEWS_TIMEOUT_SECS: &str = "NEWS_TIMEOUT_SECS";
}

/// SQLite database file name inside the storage path
pub const DB_FILE_NAME: &str = "bug_hunter.db";

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show version information
    Version,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bounty-dashboard",
    version,
    about = "Local dashboard for bug bounty hunters",
    long_about = "A single-user web dashboard that tracks bug bounty platforms, bug reports, bounty targets, checklists, notes, recon campaigns and security news in a local SQLite database."
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log format: json or pretty
    #[arg(long, env = env::LOG_FORMAT, default_value = "pretty")]
    pub log_format: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,

    /// Address the API/UI server binds to
    #[arg(long, env = env::BIND_ADDRESS, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// API/UI server port
    #[arg(long, env = env::SERVER_PORT, default_value = "5000")]
    pub server_port: u16,

    /// Storage path for the SQLite database
    #[arg(long, env = env::STORAGE_PATH, default_value = "./data")]
    pub storage_path: String,

    /// Directory for uploaded attack and exploit scripts
    #[arg(long, env = env::UPLOAD_DIR, default_value = "./uploads")]
    pub upload_dir: String,

    // ============================================
    // News feed settings
    // ============================================
    /// Fetch news from the remote feed (placeholder articles otherwise)
    #[arg(long, env = env::NEWS_ENABLED, default_value = "true", action = ArgAction::Set)]
    pub news_enabled: bool,

    /// RSS/Atom feed URL
    #[arg(
        long,
        env = env::NEWS_FEED_URL,
        default_value = "https://hackerone.com/hacktivity.rss"
    )]
    pub news_feed_url: String,

    /// Timeout in seconds for feed and checklist fetches
    #[arg(long, env = env::NEWS_TIMEOUT_SECS, default_value = "10")]
    pub news_timeout_secs: u64,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server_port == 0 {
            return Err("SERVER_PORT must be greater than 0".to_string());
        }
        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(format!(
                "BIND_ADDRESS is not a valid IP address: {}",
                self.bind_address
            ));
        }
        if self.news_timeout_secs == 0 {
            return Err("NEWS_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.news_enabled
            && !(self.news_feed_url.starts_with("http://")
                || self.news_feed_url.starts_with("https://"))
        {
            return Err("NEWS_FEED_URL must be an http(s) URL".to_string());
        }
        Ok(())
    }

    /// Get SQLite database path
    pub fn get_db_path(&self) -> String {
        format!("{}/{}", self.storage_path, DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> Config {
        Config {
            command: None,
            log_format: "pretty".to_string(),
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            server_port: 5000,
            storage_path: "./data".to_string(),
            upload_dir: "./uploads".to_string(),
            news_enabled: true,
            news_feed_url: "https://hackerone.com/hacktivity.rss".to_string(),
            news_timeout_secs: 10,
        }
    }

    #[test]
    fn test_validate_default() {
        assert!(default_config().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = default_config();
        config.server_port = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            "SERVER_PORT must be greater than 0"
        );
    }

    #[test]
    fn test_validate_bad_bind_address() {
        let mut config = default_config();
        config.bind_address = "localhost:5000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_feed_url_scheme() {
        let mut config = default_config();
        config.news_feed_url = "ftp://example.com/feed".to_string();
        assert!(config.validate().is_err());

        // Feed URL is irrelevant when news is disabled
        config.news_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = default_config();
        config.news_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_db_path() {
        let config = default_config();
        assert_eq!(config.get_db_path(), "./data/bug_hunter.db");
    }

    #[test]
    fn test_get_db_path_custom() {
        let mut config = default_config();
        config.storage_path = "/tmp/custom".to_string();
        assert_eq!(config.get_db_path(), "/tmp/custom/bug_hunter.db");
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "bounty-dashboard",
            "--server-port",
            "8080",
            "--news-enabled",
            "false",
        ])
        .expect("Failed to parse args");
        assert_eq!(config.server_port, 8080);
        assert!(!config.news_enabled);
        assert_eq!(config.bind_address, "127.0.0.1");
    }
}
