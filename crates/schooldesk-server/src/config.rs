//! Server configuration for `SchoolDesk`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `SCHOOLDESK_*` environment variables.

use std::net::SocketAddr;

use schooldesk_core::ratelimit::DEFAULT_CAPACITY;
use schooldesk_core::trial::{DEFAULT_TRIAL_DAYS, MAX_TRIAL_DAYS};

/// Onboarding flow that unknown schools are sent to.
pub const DEFAULT_ONBOARDING_URL: &str = "https://app.schooldesk.io/onboarding";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Which school store to use.
    pub store: StoreBackendType,
    /// Path to the JSON-lines audit file (optional).
    pub audit_file_path: Option<String>,
    /// Also write audit rows to `PostgreSQL` (only with the postgres store).
    pub audit_postgres: bool,
    /// Where callers are directed when their school is unknown.
    pub onboarding_url: String,
    /// Lookups allowed per client per window.
    pub rate_limit_max: u32,
    /// Rate-limit window length in seconds.
    pub rate_limit_window_secs: u64,
    /// Most clients tracked individually by the rate limiter.
    pub rate_limit_capacity: usize,
    /// Trial length in days, `1..=365`.
    pub trial_days: i64,
    /// Single allowed CORS origin; any origin when unset.
    pub cors_origin: Option<String>,
}

/// Supported school store backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendType {
    /// No store configured. Lookups fail with 500 and signups with a
    /// configuration error.
    Unconfigured,
    /// In-memory store, optionally seeded from a JSON file.
    Memory { seed_file: Option<String> },
    /// `PostgreSQL` managed database.
    Postgres { url: String },
}

impl StoreBackendType {
    /// Short name for logs and health output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Memory { .. } => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `SCHOOLDESK_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `SCHOOLDESK_LOG_LEVEL`: log filter (default: `info`)
    /// - `SCHOOLDESK_STORE`: `memory` or `postgres` (default: `postgres` if `DATABASE_URL` is set)
    /// - `DATABASE_URL`: `PostgreSQL` connection string
    /// - `SCHOOLDESK_SEED_FILE`: JSON array of schools for the memory store
    /// - `SCHOOLDESK_AUDIT_FILE`: path to the JSON-lines audit file
    /// - `SCHOOLDESK_AUDIT_POSTGRES`: write audit rows to `PostgreSQL` (default: `false`)
    /// - `SCHOOLDESK_ONBOARDING_URL`: onboarding link used in error messages
    /// - `SCHOOLDESK_RATE_LIMIT_MAX`: lookups per window (default: `30`)
    /// - `SCHOOLDESK_RATE_LIMIT_WINDOW_SECS`: window length (default: `60`)
    /// - `SCHOOLDESK_RATE_LIMIT_CAPACITY`: clients tracked individually (default: `10000`)
    /// - `SCHOOLDESK_TRIAL_DAYS`: trial length, `1` to `365` (default: `30`)
    /// - `SCHOOLDESK_CORS_ORIGIN`: allowed CORS origin (default: any)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: SCHOOLDESK_BIND_ADDR > PORT > default 127.0.0.1:3000
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 3000));
        let bind_addr = if let Some(addr) = get("SCHOOLDESK_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = get("PORT") {
            SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(3000)))
        } else {
            default_addr
        };

        let log_level = get("SCHOOLDESK_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let database_url = get("DATABASE_URL").filter(|u| !u.is_empty());
        let store = match get("SCHOOLDESK_STORE").map(|s| s.to_lowercase()).as_deref() {
            Some("memory") => StoreBackendType::Memory {
                seed_file: get("SCHOOLDESK_SEED_FILE"),
            },
            Some("postgres" | "postgresql") | None => match database_url {
                Some(url) => StoreBackendType::Postgres { url },
                None => StoreBackendType::Unconfigured,
            },
            Some(_) => StoreBackendType::Unconfigured,
        };

        let audit_file_path = get("SCHOOLDESK_AUDIT_FILE").filter(|p| !p.is_empty());
        let audit_postgres = get("SCHOOLDESK_AUDIT_POSTGRES").is_some_and(|v| v == "true" || v == "1");

        let onboarding_url = get("SCHOOLDESK_ONBOARDING_URL")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_ONBOARDING_URL.to_owned());

        let rate_limit_max = get("SCHOOLDESK_RATE_LIMIT_MAX")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(30);
        let rate_limit_window_secs = get("SCHOOLDESK_RATE_LIMIT_WINDOW_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(60);

        let rate_limit_capacity = get("SCHOOLDESK_RATE_LIMIT_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CAPACITY);

        let trial_days = get("SCHOOLDESK_TRIAL_DAYS")
            .and_then(|v| v.parse().ok())
            .filter(|n| (1..=MAX_TRIAL_DAYS).contains(n))
            .unwrap_or(DEFAULT_TRIAL_DAYS);

        let cors_origin = get("SCHOOLDESK_CORS_ORIGIN").filter(|o| !o.is_empty());

        Self {
            bind_addr,
            log_level,
            store,
            audit_file_path,
            audit_postgres,
            onboarding_url,
            rate_limit_max,
            rate_limit_window_secs,
            rate_limit_capacity,
            trial_days,
            cors_origin,
        }
    }
}
