use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vkinder::config::{LoggingSettings, Settings};
use vkinder::core::{DiscoveryEngine, InteractionCoordinator};
use vkinder::routes::{self, AppState};
use vkinder::services::{
    CacheManager, CachingTransport, CandidateStore, InMemoryStore, PostgresStore, Transport,
    VkClient,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Install the global subscriber; LOG_LEVEL and LOG_FORMAT win over the config file
fn init_tracing(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting VKinder discovery service...");

    let settings = settings.map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    // Cache is optional; without Redis the L1 cache still serves this instance
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(
        settings.cache.redis_url.as_deref(),
        l1_cache_size,
        cache_ttl,
    )
    .await
    {
        Ok(c) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            Arc::new(c)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), running with the in-process cache only", e);
            Arc::new(CacheManager::in_memory(l1_cache_size, cache_ttl))
        }
    };

    let vk = VkClient::new(
        settings.vk.endpoint.clone(),
        settings.vk.access_token.clone(),
        settings.vk.api_version.clone(),
        settings.vk.lang,
        settings.vk.timeout(),
    )
    .map_err(|e| startup_error("Failed to build VK client", e))?;

    let transport: Arc<dyn Transport> = Arc::new(CachingTransport::new(vk, Arc::clone(&cache)));

    info!("VK client initialized (API {})", settings.vk.api_version);

    let store: Arc<dyn CandidateStore> = match &settings.database.url {
        Some(url) => {
            let postgres = PostgresStore::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("PostgreSQL connection error", e))?;
            info!("PostgreSQL candidate store initialized");
            Arc::new(postgres)
        }
        None => {
            warn!("No database configured, discovery state will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let discovery = settings.discovery.engine_settings(settings.vk.lang);
    let engine = Arc::new(DiscoveryEngine::new(
        Arc::clone(&transport),
        Arc::clone(&store),
        discovery,
    ));
    let coordinator = Arc::new(InteractionCoordinator::new(
        Arc::clone(&transport),
        Arc::clone(&store),
    ));

    info!("Discovery engine initialized: {:?}", discovery);

    // Build application state
    let app_state = AppState {
        engine,
        coordinator,
        store,
        cache,
        age_radius: settings.discovery.default_age_radius,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
