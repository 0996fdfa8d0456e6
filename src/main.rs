// src/main.rs
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Duration;
use log::{error, info, warn};

use yatube_be::AppState;
use yatube_be::config::{self, AppConfig};
use yatube_be::handlers;
use yatube_be::middleware::auth_extractor::AuthConfig;
use yatube_be::repositories::{EntityStore, MemoryStore, PgStore};
use yatube_be::services::media_services::MediaStorage;
use yatube_be::services::page_cache::{PageCache, SystemClock};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn EntityStore> = match cfg.postgres.as_ref() {
        Some(pg) => {
            let pool = match config::get_pg_pool(pg) {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to create PG pool: {:#}", e);
                    std::process::exit(1);
                }
            };
            let store = PgStore::new(pool);
            if let Err(e) = store.ensure_schema().await {
                error!("Failed to prepare database schema: {}", e);
                std::process::exit(1);
            }
            info!("Using postgres at {}/{}", pg.host, pg.dbname);
            Arc::new(store)
        }
        None => {
            warn!("PG_HOST not set, posts are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let cache = Arc::new(PageCache::new(
        Duration::seconds(cfg.cache_ttl_secs),
        Arc::new(SystemClock),
    ));
    let state = web::Data::new(AppState::new(
        store,
        cache,
        MediaStorage::new(cfg.media_root.clone()),
    ));
    let auth_data = web::Data::new(AuthConfig::new(cfg.jwt_secret.clone()));

    let allowed_origins = cfg.allowed_origins.clone();
    let bind_address = format!("0.0.0.0:{}", cfg.port);
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept"])
            .supports_credentials()
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(auth_data.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
