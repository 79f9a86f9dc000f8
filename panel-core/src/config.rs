//! Process configuration
//!
//! Resolved once at startup from environment variables (after `.env` is
//! loaded). The granular-permission part is split out into an immutable
//! [`GranularConfig`] that is handed to the authorizer and mutation layer.

pub const DEFAULT_DATABASE_URL: &str = "sqlite:panel.db";
pub const DEFAULT_PERMISSION_PREFIX: &str = "granular-perms";

/// Feature switch + permission name prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranularConfig {
    /// When false every authorization predicate passes
    pub enabled: bool,
    pub prefix: String,
}

impl Default for GranularConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: DEFAULT_PERMISSION_PREFIX.to_string(),
        }
    }
}

impl GranularConfig {
    pub fn new(enabled: bool, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim();
        Self {
            enabled,
            prefix: if prefix.is_empty() {
                DEFAULT_PERMISSION_PREFIX.to_string()
            } else {
                prefix.to_string()
            },
        }
    }

    /// Prefix a permission slug: `create-new-user` -> `granular-perms.create-new-user`.
    /// Names already carrying the prefix are returned unchanged.
    pub fn normalize(&self, name: &str) -> String {
        let name = name.trim();
        match name.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.starts_with('.') => name.to_string(),
            _ => format!("{}.{}", self.prefix, name),
        }
    }

    /// Normalize a list, dropping duplicates while keeping first-seen order
    pub fn normalize_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let normalized = self.normalize(name.as_ref());
            if !out.contains(&normalized) {
                out.push(normalized);
            }
        }
        out
    }
}

/// Admin panel configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub granular: GranularConfig,
    pub log_level: String,
    /// JSON log output (production)
    pub log_json: bool,
    /// Optional directory for rotating log files
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();

        Self {
            database_url: var("DATABASE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
            granular: GranularConfig::new(
                parse_flag(var("ENABLE_GRANULAR_PERMISSIONS").as_deref(), true),
                var("GRANULAR_PERMISSIONS_PREFIX").unwrap_or_default(),
            ),
            log_level: var("LOG_LEVEL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "info".into()),
            log_json: parse_flag(var("LOG_JSON").as_deref(), false),
            log_dir: var("LOG_DIR").filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Unset or empty -> `default`; `true`/`1` (any case) -> true; anything else -> false
fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim) {
        None | Some("") => default,
        Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
    }
}
