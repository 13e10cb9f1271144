//! Dashboard summary statistics

use std::collections::BTreeMap;

use rusqlite::Connection;
use rusqlite::types::FromSql;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::database::Database;
use super::error::StoreError;

const RESOLVED_STATUSES: &str = "('resolved', 'bounty_awarded')";

/// Dashboard summary; every metric falls back to zero independently
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_bugs: i64,
    /// Reports with a status outside resolved/bounty_awarded; a NULL status is not counted
    pub active_bugs: i64,
    pub resolved_bugs: i64,
    pub total_bounties: f64,
    /// Bounties on reports created since the start of the current month
    pub monthly_earnings: f64,
    /// Active platforms
    pub platforms_count: i64,
    pub checklists_count: i64,
    pub notes_count: i64,
    pub active_targets: i64,
    pub total_targets: i64,
    pub total_campaigns: i64,
    /// Percentage of resolved reports, one decimal place
    #[schema(example = 42.9)]
    pub success_rate: f64,
    /// Bug count per platform name
    pub platform_distribution: BTreeMap<String, i64>,
    /// Bug count per vulnerability type
    pub vuln_distribution: BTreeMap<String, i64>,
}

/// Share of resolved reports as a percentage rounded to one decimal place
pub fn success_rate(resolved: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (resolved as f64 / total as f64 * 1000.0).round() / 10.0
}

fn scalar<T: FromSql + Default>(conn: &Connection, metric: &str, sql: &str) -> T {
    match conn.query_row(sql, [], |row| row.get::<_, Option<T>>(0)) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(metric = metric, error = %e, "Failed to compute dashboard metric, using 0");
            T::default()
        }
    }
}

fn distribution(conn: &Connection, metric: &str, column: &str) -> BTreeMap<String, i64> {
    let query = || -> rusqlite::Result<BTreeMap<String, i64>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT \"{0}\", COUNT(*) FROM bug_reports WHERE \"{0}\" IS NOT NULL GROUP BY \"{0}\"",
            column
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        rows.collect()
    };

    query().unwrap_or_else(|e| {
        warn!(metric = metric, error = %e, "Failed to compute dashboard distribution, using empty");
        BTreeMap::new()
    })
}

impl Database {
    /// Compute the dashboard summary. Never fails.
    pub fn dashboard_stats(&self) -> DashboardStats {
        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Dashboard stats unavailable, returning zeros");
                return DashboardStats::default();
            }
        };
        let stats = collect(&conn);

        debug!(
            total_bugs = stats.total_bugs,
            resolved_bugs = stats.resolved_bugs,
            total_bounties = stats.total_bounties,
            "Dashboard stats computed"
        );
        stats
    }

    /// Count rows of a table by name; used by status endpoints
    pub fn count_rows(&self, table: &str) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
            row.get(0)
        })?)
    }
}

fn collect(conn: &Connection) -> DashboardStats {
    let total_bugs: i64 = scalar(conn, "total_bugs", "SELECT COUNT(*) FROM bug_reports");
    let resolved_bugs: i64 = scalar(
        conn,
        "resolved_bugs",
        &format!("SELECT COUNT(*) FROM bug_reports WHERE status IN {}", RESOLVED_STATUSES),
    );
    let active_bugs: i64 = scalar(
        conn,
        "active_bugs",
        &format!(
            "SELECT COUNT(*) FROM bug_reports WHERE status NOT IN {}",
            RESOLVED_STATUSES
        ),
    );

    DashboardStats {
        total_bugs,
        active_bugs,
        resolved_bugs,
        total_bounties: scalar(
            conn,
            "total_bounties",
            "SELECT CAST(COALESCE(SUM(bounty_amount), 0) AS REAL) FROM bug_reports",
        ),
        monthly_earnings: scalar(
            conn,
            "monthly_earnings",
            "SELECT CAST(COALESCE(SUM(bounty_amount), 0) AS REAL) FROM bug_reports \
             WHERE created_at >= strftime('%Y-%m-01 00:00:00', 'now')",
        ),
        platforms_count: scalar(
            conn,
            "platforms_count",
            "SELECT COUNT(*) FROM platforms WHERE is_active = 1",
        ),
        checklists_count: scalar(
            conn,
            "checklists_count",
            "SELECT COUNT(*) FROM security_checklists",
        ),
        notes_count: scalar(conn, "notes_count", "SELECT COUNT(*) FROM personal_notes"),
        active_targets: scalar(
            conn,
            "active_targets",
            "SELECT COUNT(*) FROM bounty_targets WHERE is_active = 1",
        ),
        total_targets: scalar(conn, "total_targets", "SELECT COUNT(*) FROM bounty_targets"),
        total_campaigns: scalar(
            conn,
            "total_campaigns",
            "SELECT COUNT(*) FROM recon_campaigns",
        ),
        success_rate: success_rate(resolved_bugs, total_bugs),
        platform_distribution: distribution(conn, "platform_distribution", "platform"),
        vuln_distribution: distribution(conn, "vuln_distribution", "vulnerability_type"),
    }
}
