//! Environment-driven configuration.
//!
//! Everything the daemon needs comes from the environment; defaults cover
//! the local Postgres/Redis ports. Missing FIX credentials are tolerated
//! at load time — the upstream will reject the logon and the reconnect
//! loop takes over from there.

use std::env;

use tracing::warn;

/// Upstream FIX endpoint and identities.
#[derive(Debug, Clone)]
pub struct FixConfig {
    pub server: String,
    pub port: u16,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fix: FixConfig,
    pub pg_host: String,
    pub pg_port: u16,
    pub pg_user: String,
    pub pg_password: String,
    pub pg_database: String,
    pub redis_host: String,
    pub redis_port: u16,
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u16(key: &str, default: u16) -> u16 {
    match env::var(key).ok().and_then(|v| v.trim().parse::<u16>().ok()) {
        Some(v) => v,
        None => default,
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let fix = FixConfig {
            server: env_string("FIX_SERVER", ""),
            port: env_u16("FIX_PORT", 0),
            sender_comp_id: env_string("SENDER_COMP_ID", ""),
            target_comp_id: env_string("TARGET_COMP_ID", ""),
            username: env_string("USERNAME", ""),
            password: env_string("PASSWORD", ""),
        };

        if fix.username.is_empty() || fix.password.is_empty() {
            warn!("FIX credentials missing (USERNAME/PASSWORD); logon will fail upstream");
        }
        if fix.server.is_empty() {
            warn!("FIX_SERVER not set; session connect will fail and retry");
        }

        Self {
            fix,
            pg_host: env_string("PG_HOST", ""),
            pg_port: env_u16("PG_PORT", 5432),
            pg_user: env_string("PG_USER", ""),
            pg_password: env_string("PG_PASSWORD", ""),
            pg_database: env_string("PG_DATABASE", ""),
            redis_host: env_string("REDIS_HOST", "localhost"),
            redis_port: env_u16("REDIS_PORT", 6379),
        }
    }

    pub fn pg_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.pg_user, self.pg_password, self.pg_host, self.pg_port, self.pg_database
        )
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}
