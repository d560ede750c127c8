use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use vkinder::config::{Settings, StorageBackend};
use vkinder::core::{Assistant, DialogMachine, DiscoveryEngine};
use vkinder::routes::{self, AppState};
use vkinder::services::{ExclusionStore, MemoryStore, PostgresClient, SessionStore, VkClient};

/// JSON error response for payload errors
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

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting vkinder dialog service...");

    let settings = Settings::load().map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    if settings.vk.token.is_empty() {
        error!("VK token is empty, directory calls will fail until VK_TOKEN is set");
    }

    let vk = Arc::new(
        VkClient::new(
            settings.vk.api_url.clone(),
            settings.vk.token.clone(),
            Duration::from_secs(settings.vk.timeout_secs),
        )
        .map_err(|e| startup_error("VK client error", e))?,
    );

    info!("VK client initialized ({})", settings.vk.api_url);

    let store: Arc<dyn ExclusionStore> = match settings.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory exclusion store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let postgres = PostgresClient::from_settings(
                &settings.database.url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("PostgreSQL connection error", e))?;

            info!(
                "PostgreSQL client initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            Arc::new(postgres)
        }
    };

    // Redis snapshots are optional; fall back to memory-only sessions
    let sessions = match &settings.session.redis_url {
        Some(url) => match SessionStore::with_redis(
            url,
            settings.session.max_sessions,
            settings.session.idle_ttl_secs,
        )
        .await
        {
            Ok(sessions) => {
                info!("Session store initialized with Redis snapshots");
                sessions
            }
            Err(e) => {
                error!("Failed to connect to Redis ({}), running with in-memory sessions", e);
                SessionStore::new(settings.session.max_sessions, settings.session.idle_ttl_secs)
            }
        },
        None => SessionStore::new(settings.session.max_sessions, settings.session.idle_ttl_secs),
    };

    info!(
        "Sessions: max {} entries, idle TTL {}s",
        settings.session.max_sessions, settings.session.idle_ttl_secs
    );

    let dialog = DialogMachine::new(vk.clone(), vk.clone(), store.clone(), settings.dialog.options());
    let discovery = DiscoveryEngine::new(
        vk.clone(),
        vk,
        store.clone(),
        settings.discovery.limits(),
        settings.dialog.fallback_location(),
        settings.dialog.sex_selection,
    );

    info!(
        "Dialog initialized: sex selection {:?}, limits {:?}",
        settings.dialog.sex_selection,
        settings.discovery.limits()
    );

    let assistant = Assistant::new(
        Arc::new(sessions),
        dialog,
        discovery,
        store,
        settings.assistant_options(),
    );

    let app_state = AppState {
        assistant: Arc::new(assistant),
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
