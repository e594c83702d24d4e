//! Server configuration.
//!
//! Host and port come from the CLI (see `bin/server.rs`); everything else
//! is environment-driven, matching how deployments configure the service:
//!
//! - `CORS_ORIGINS` — comma-separated origin list, or `*`/`true` for any
//! - `ADMIN_USERS` — comma-separated username allow-list (default `ADMIN`)
//! - `ADMIN_TOKEN` — bearer value for `GET /api/admin/stats`; unset
//!   disables the endpoint
//! - `SYNC_THROTTLE_MS` — playback-control coalescing window (default 50)
//! - `RESTRICT_PLAYLIST_TO_HOST` — gate playlist add/remove/next/previous
//!   to the host (default false; reorder is always host-only)
//! - `STORAGE_PROVIDER` — which write-only storage hook to use

use std::collections::HashSet;

/// Coalescing window applied to non-volume playback controls.
pub const DEFAULT_SYNC_THROTTLE_MS: i64 = 50;

const DEFAULT_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://localhost",
    "https://localhost",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    /// No durable storage; hooks are no-ops.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cors: CorsOrigins,
    /// Uppercased usernames granted cross-room administrative authority.
    pub admin_users: HashSet<String>,
    /// Shared secret for the HTTP admin surface; `None` disables it.
    pub admin_token: Option<String>,
    pub sync_throttle_ms: i64,
    pub restrict_playlist_to_host: bool,
    pub storage_provider: StorageProvider,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cors: parse_origins(None),
            admin_users: parse_admin_users(None),
            admin_token: None,
            sync_throttle_ms: DEFAULT_SYNC_THROTTLE_MS,
            restrict_playlist_to_host: false,
            storage_provider: StorageProvider::Memory,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            cors: parse_origins(std::env::var("CORS_ORIGINS").ok().as_deref()),
            admin_users: parse_admin_users(std::env::var("ADMIN_USERS").ok().as_deref()),
            admin_token: parse_token(std::env::var("ADMIN_TOKEN").ok()),
            sync_throttle_ms: parse_throttle(std::env::var("SYNC_THROTTLE_MS").ok().as_deref()),
            restrict_playlist_to_host: parse_bool(
                std::env::var("RESTRICT_PLAYLIST_TO_HOST").ok().as_deref(),
            ),
            storage_provider: parse_provider(std::env::var("STORAGE_PROVIDER").ok().as_deref()),
        }
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        !username.is_empty() && self.admin_users.contains(&username.to_uppercase())
    }
}

fn parse_origins(raw: Option<&str>) -> CorsOrigins {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw == "*" || raw.eq_ignore_ascii_case("true") {
        return CorsOrigins::Any;
    }
    if raw.is_empty() {
        return CorsOrigins::List(DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect());
    }
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        CorsOrigins::List(DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect())
    } else {
        CorsOrigins::List(origins)
    }
}

fn parse_admin_users(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or("ADMIN")
        .split(',')
        .map(|u| u.trim().to_uppercase())
        .filter(|u| !u.is_empty())
        .collect()
}

fn parse_token(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_throttle(raw: Option<&str>) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid SYNC_THROTTLE_MS '{}', using default", s);
            DEFAULT_SYNC_THROTTLE_MS
        }),
        None => DEFAULT_SYNC_THROTTLE_MS,
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim),
        Some(s) if s.eq_ignore_ascii_case("true") || s == "1"
    )
}

fn parse_provider(raw: Option<&str>) -> StorageProvider {
    match raw.map(str::trim) {
        None | Some("") | Some("memory") => StorageProvider::Memory,
        Some(other) => {
            tracing::warn!(
                "Unknown STORAGE_PROVIDER '{}', falling back to in-memory storage",
                other
            );
            StorageProvider::Memory
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_default_to_localhost_dev_set() {
        let CorsOrigins::List(origins) = parse_origins(None) else {
            panic!("expected list");
        };
        assert_eq!(origins.len(), 3);
        assert!(origins.contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn origins_wildcard_allows_any() {
        assert_eq!(parse_origins(Some("*")), CorsOrigins::Any);
        assert_eq!(parse_origins(Some("true")), CorsOrigins::Any);
    }

    #[test]
    fn origins_list_is_trimmed() {
        let parsed = parse_origins(Some("http://a.example, http://b.example ,"));
        assert_eq!(
            parsed,
            CorsOrigins::List(vec![
                "http://a.example".to_string(),
                "http://b.example".to_string()
            ])
        );
    }

    #[test]
    fn admin_users_are_uppercased() {
        let admins = parse_admin_users(Some("alice, Bob"));
        assert!(admins.contains("ALICE"));
        assert!(admins.contains("BOB"));
        assert_eq!(admins.len(), 2);
    }

    #[test]
    fn admin_check_is_case_insensitive() {
        let config = Config {
            admin_users: parse_admin_users(Some("root")),
            ..Config::default()
        };
        assert!(config.is_admin_username("Root"));
        assert!(config.is_admin_username("ROOT"));
        assert!(!config.is_admin_username("alice"));
        assert!(!config.is_admin_username(""));
    }

    #[test]
    fn blank_admin_token_disables_the_http_surface() {
        assert_eq!(parse_token(None), None);
        assert_eq!(parse_token(Some("   ".to_string())), None);
        assert_eq!(
            parse_token(Some(" s3cret ".to_string())),
            Some("s3cret".to_string())
        );
    }

    #[test]
    fn throttle_falls_back_on_garbage() {
        assert_eq!(parse_throttle(Some("75")), 75);
        assert_eq!(parse_throttle(Some("abc")), DEFAULT_SYNC_THROTTLE_MS);
        assert_eq!(parse_throttle(None), DEFAULT_SYNC_THROTTLE_MS);
    }

    #[test]
    fn unknown_provider_falls_back_to_memory() {
        assert_eq!(parse_provider(Some("mysql")), StorageProvider::Memory);
        assert_eq!(parse_provider(None), StorageProvider::Memory);
    }
}
