use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

use crate::services::page_cache::DEFAULT_TTL_SECS;

#[derive(Debug, Clone)]
pub struct PgSettings {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    pub cache_ttl_secs: i64,
    pub allowed_origins: Vec<String>,
    /// `None` when `PG_HOST` is unset: the in-memory store is used instead.
    pub postgres: Option<PgSettings>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: u16 = match lookup("PORT") {
            Some(p) => p.trim().parse().context("PORT must be a port number")?,
            None => 8080,
        };
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not set")?;
        let media_root = lookup("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("media"));
        let cache_ttl_secs: i64 = match lookup("PAGE_CACHE_TTL_SECS") {
            Some(ttl) => ttl
                .trim()
                .parse()
                .context("PAGE_CACHE_TTL_SECS must be a number of seconds")?,
            None => DEFAULT_TTL_SECS,
        };
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let postgres = match lookup("PG_HOST") {
            Some(host) => Some(PgSettings {
                host,
                user: lookup("PG_USER").context("PG_USER not set")?,
                password: lookup("PG_PASS"),
                dbname: lookup("PG_DB").context("PG_DB not set")?,
            }),
            None => None,
        };

        Ok(Self {
            port,
            jwt_secret,
            media_root,
            cache_ttl_secs,
            allowed_origins,
            postgres,
        })
    }
}

pub fn get_pg_pool(settings: &PgSettings) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(settings.host.clone());
    cfg.user = Some(settings.user.clone());
    cfg.password = settings.password.clone();
    cfg.dbname = Some(settings.dbname.clone());

    let mut pool: PoolConfig = cfg.pool.take().unwrap_or_default();
    pool.max_size = 16;
    cfg.pool = Some(pool);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("failed to create postgres pool")
}
