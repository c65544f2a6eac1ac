use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_addr: String,
    pub port: u16,
    pub allowed_origin: String,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub session_ttl_hours: i64,
    pub session_sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: resolve_data_path(None, "streamapp.db"),
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origin: "http://localhost:3000".to_string(),
            cookie_secure: true,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_ttl_hours: 24,
            session_sweep_interval_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_path = resolve_data_path(env::var("AUTH_DB_PATH").ok(), "streamapp.db");

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let allowed_origin = env::var("ALLOWED_ORIGIN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.allowed_origin);

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.cookie_secure);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|c| (4..=31).contains(c))
            .unwrap_or(defaults.bcrypt_cost);

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&h| h > 0)
            .unwrap_or(defaults.session_ttl_hours);

        let session_sweep_interval_secs = env::var("SESSION_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.session_sweep_interval_secs);

        Ok(Self {
            database_path,
            bind_addr,
            port,
            allowed_origin,
            cookie_secure,
            bcrypt_cost,
            session_ttl_hours,
            session_sweep_interval_secs,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

pub fn parse_flag(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "on" | "ON")
}

/// Relative paths resolve against the crate dir, not the caller's cwd.
pub fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = env_value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_filename.to_string());

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    base.join(p).to_string_lossy().to_string()
}
