//! Runtime configuration read from the environment
//!
//! `.env` is loaded by `main` through `dotenvy` before these are read.

use std::env;
use std::time::Duration;

/// Server settings
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "mbl.db")
/// - `AUTHORIZATION` - Token required on every API request (unset: no check)
/// - `MBL_SEED_DEMO` - Insert demo clients into an empty database (default: true)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub auth_token: Option<String>,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "mbl.db".to_string());

        let auth_token = env::var("AUTHORIZATION").ok().filter(|t| !t.is_empty());

        let seed_demo = env::var("MBL_SEED_DEMO")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Self {
            port,
            database_url,
            auth_token,
            seed_demo,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Dashboard controller settings
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Server origin, e.g. `http://localhost:8080`
    pub base_url: String,

    /// Period between automatic KPI reloads while the dashboard tab is active
    pub auto_refresh: Duration,

    /// How long a notification stays visible
    pub notification_ttl: Duration,

    /// Initial value of the analytics period selector, in days
    pub analytics_days: u32,

    /// Initial value of the top-clients limit selector
    pub top_clients_limit: usize,
}

impl DashboardConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auto_refresh: Duration::from_secs(5 * 60),
            notification_ttl: Duration::from_secs(5),
            analytics_days: 30,
            top_clients_limit: 10,
        }
    }
}
