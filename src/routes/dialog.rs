use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{Assistant, AssistantError};
use crate::models::{
    BotReply, CommandRequest, ErrorResponse, FavoritesQuery, FavoritesResponse, HealthResponse,
    StartRequest, TextMessageRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
}

/// Configure all dialog-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/dialog/start", web::post().to(start))
        .route("/dialog/message", web::post().to(message))
        .route("/dialog/command", web::post().to(command))
        .route("/favorites", web::get().to(favorites));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn reply_or_error(request_id: uuid::Uuid, result: Result<BotReply, AssistantError>) -> HttpResponse {
    match result {
        Ok(reply) => HttpResponse::Ok().json(reply),
        Err(e) => {
            tracing::error!("Request {} failed: {}", request_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to handle dialog event".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = match state.assistant.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.assistant.session_count(),
        timestamp: chrono::Utc::now(),
    })
}

/// Start onboarding
///
/// POST /api/v1/dialog/start
///
/// Request body:
/// ```json
/// { "userId": 12345 }
/// ```
async fn start(state: web::Data<AppState>, req: web::Json<StartRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for start request: {:?}", errors);
        return validation_error(errors);
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!("Request {}: start for user {}", request_id, req.user_id);

    reply_or_error(request_id, state.assistant.on_start(req.user_id).await)
}

/// Free-text message
///
/// POST /api/v1/dialog/message
///
/// Request body:
/// ```json
/// { "userId": 12345, "text": "Moscow" }
/// ```
async fn message(
    state: web::Data<AppState>,
    req: web::Json<TextMessageRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for message request: {:?}", errors);
        return validation_error(errors);
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!("Request {}: message from user {}", request_id, req.user_id);

    reply_or_error(
        request_id,
        state.assistant.on_text_message(req.user_id, &req.text).await,
    )
}

/// Keyboard command
///
/// POST /api/v1/dialog/command
///
/// Request body:
/// ```json
/// { "userId": 12345, "command": "next" }
/// ```
async fn command(state: web::Data<AppState>, req: web::Json<CommandRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for command request: {:?}", errors);
        return validation_error(errors);
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(
        "Request {}: command {:?} from user {}",
        request_id,
        req.command,
        req.user_id
    );

    reply_or_error(
        request_id,
        state.assistant.on_command(req.user_id, req.command).await,
    )
}

/// Favorites listing
///
/// GET /api/v1/favorites?userId=12345
async fn favorites(
    state: web::Data<AppState>,
    query: web::Query<FavoritesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.assistant.favorites(query.user_id).await {
        Ok(favorites) => {
            let count = favorites.len();
            HttpResponse::Ok().json(FavoritesResponse {
                user_id: query.user_id,
                favorites,
                count,
            })
        }
        Err(e) => {
            tracing::error!("Failed to list favorites for {}: {}", query.user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to list favorites".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
