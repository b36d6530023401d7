//! Postgres pool construction.
//!
//! The scaling discipline this schema needs (range partitioning, GIN
//! indexes, multilingual FTS configs) is Postgres-specific, so unlike the
//! wider example pack's multi-backend pool module, this one targets a
//! single database type.

use crate::error::{PersistenceError, PersistenceResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    /// Statement timeout applied to persistence transactions.
    pub transaction_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> PersistenceResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| PersistenceError::invalid_state("DATABASE_URL is not set"))?;
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let transaction_timeout_secs = std::env::var("DB_TRANSACTION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        Ok(Self {
            url,
            max_connections,
            transaction_timeout: Duration::from_secs(transaction_timeout_secs),
        })
    }
}

/// Which full-text-search configurations a deployment has created and
/// which document languages route to them. The migration always creates
/// `simple` plus partial indexes for `russian` (the Slavic-family stand-in;
/// Postgres ships no Ukrainian/Belarusian config of its own) and `english`;
/// these two knobs let an operator narrow what `search_documents` is
/// allowed to route queries to without touching the schema.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    /// Non-`simple` tsvector configurations this deployment may route to.
    pub languages: Vec<String>,
    /// Document language codes that route to the `russian` partial index.
    pub partial_index_languages: Vec<String>,
}

impl FtsConfig {
    pub fn from_env() -> Self {
        let languages = std::env::var("FTS_LANGUAGES")
            .ok()
            .map(|v| split_csv(&v))
            .unwrap_or_else(|| vec!["russian".to_string(), "english".to_string()]);
        let partial_index_languages = std::env::var("FTS_PARTIAL_INDEX_LANGUAGES")
            .ok()
            .map(|v| split_csv(&v))
            .unwrap_or_else(|| {
                ["ru", "uk", "be", "bg", "sr", "pl"].iter().map(|s| s.to_string()).collect()
            });
        Self { languages, partial_index_languages }
    }

    /// Choose the tsvector configuration for a document-language hint,
    /// falling back to `simple` when the hint is absent or this
    /// deployment has not enabled a configuration for it.
    pub fn config_for(&self, language: Option<&str>) -> &'static str {
        let Some(lang) = language else { return "simple" };
        let lang = lang.to_lowercase();
        if lang == "en" && self.languages.iter().any(|l| l == "english") {
            return "english";
        }
        if self.partial_index_languages.iter().any(|l| *l == lang) && self.languages.iter().any(|l| l == "russian") {
            return "russian";
        }
        "simple"
    }
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect()
}

/// Create a pool and apply the per-connection statement timeout.
pub async fn create_pool(config: &DbConfig) -> PersistenceResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect({
            let timeout_ms = config.transaction_timeout.as_millis() as i64;
            move |conn, _meta| {
                Box::pin(async move {
                    sqlx::query(&format!("SET statement_timeout = {timeout_ms}"))
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            }
        })
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Run all migrations embedded at compile time.
pub async fn run_migrations(pool: &PgPool) -> PersistenceResult<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| PersistenceError::invalid_state(e.to_string()))?;
    Ok(())
}
