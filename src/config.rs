use std::env;

use anyhow::Context;
use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub completed_limit: i64,
    pub require_completion_notes: bool,
    pub practice_offset: FixedOffset,
    pub document_sync_url: Option<String>,
    pub text_rewrite_url: Option<String>,
    pub functions_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 10u32)?;
        let completed_limit = parse_var("COMPLETED_APPOINTMENTS_LIMIT", 20i64)?;
        if completed_limit <= 0 {
            anyhow::bail!("COMPLETED_APPOINTMENTS_LIMIT must be > 0");
        }
        let require_completion_notes = parse_var("REQUIRE_COMPLETION_NOTES", true)?;

        let offset_minutes = parse_var("PRACTICE_UTC_OFFSET_MINUTES", 0i32)?;
        let practice_offset = FixedOffset::east_opt(offset_minutes * 60)
            .with_context(|| format!("PRACTICE_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            completed_limit,
            require_completion_notes,
            practice_offset,
            document_sync_url: optional_var("DOCUMENT_SYNC_URL"),
            text_rewrite_url: optional_var("TEXT_REWRITE_URL"),
            functions_api_key: optional_var("FUNCTIONS_API_KEY"),
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
    }
}
