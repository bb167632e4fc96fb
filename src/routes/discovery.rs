use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{DiscoveryEngine, DiscoveryError, InteractionCoordinator};
use crate::models::{
    BlockResponse, CandidateListResponse, CandidateRequest, DecisionRequest, DecisionResponse,
    ErrorResponse, HealthResponse, ListUpdateResponse, NextCandidateRequest, PreferencesRequest,
    PreferencesResponse, RequesterRequest, ResetResponse, UserId,
};
use crate::services::{CacheManager, CandidateStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DiscoveryEngine>,
    pub coordinator: Arc<InteractionCoordinator>,
    pub store: Arc<dyn CandidateStore>,
    pub cache: Arc<CacheManager>,
    /// Age radius used when deriving default criteria
    pub age_radius: u8,
}

/// Configure all discovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/discovery/next", web::post().to(next_candidate))
        .route("/discovery/reset", web::post().to(reset_seen))
        .route("/decisions", web::post().to(apply_decision))
        .route("/decisions/skip", web::post().to(skip_candidate))
        .service(
            web::resource("/blocks")
                .route(web::post().to(block_candidate))
                .route(web::delete().to(unblock_candidate))
                .route(web::get().to(get_blocked)),
        )
        .service(
            web::resource("/favorites")
                .route(web::post().to(add_favorite))
                .route(web::delete().to(remove_favorite))
                .route(web::get().to(get_favorites)),
        )
        .service(
            web::resource("/preferences")
                .route(web::put().to(save_preferences))
                .route(web::get().to(get_preferences)),
        )
        .route("/liked", web::get().to(get_liked))
        .route("/seen", web::get().to(get_seen));
}

/// HTTP status for each discovery failure
pub fn status_for(err: &DiscoveryError) -> StatusCode {
    match err {
        DiscoveryError::InvalidCriteria(_) => StatusCode::BAD_REQUEST,
        DiscoveryError::TransportUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DiscoveryError::RemoteRejected { .. } => StatusCode::BAD_GATEWAY,
        DiscoveryError::NotSurfaced { .. } => StatusCode::CONFLICT,
        DiscoveryError::RequesterNotFound(_) => StatusCode::NOT_FOUND,
        DiscoveryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: DiscoveryError) -> HttpResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected: {}", err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
        retryable: err.is_retryable(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
        retryable: false,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_entries: state.cache.entry_count(),
        timestamp: chrono::Utc::now(),
    })
}

/// Next candidate endpoint
///
/// POST /api/v1/discovery/next
///
/// Request body:
/// ```json
/// {
///   "requesterId": 1,
///   "criteria": { "sex": "female", "ageFrom": 25, "ageTo": 30, "city": 1 }
/// }
/// ```
///
/// Without `criteria` the requester's saved preferences apply, falling back
/// to criteria derived from their profile.
///
/// Responds with `{"status": "found", "candidate": {...}}` or
/// `{"status": "exhausted"}`.
async fn next_candidate(
    state: web::Data<AppState>,
    req: web::Json<NextCandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let requester = match state
        .engine
        .resolve_requester(req.requester_id, state.age_radius)
        .await
    {
        Ok(requester) => requester,
        Err(e) => return error_response(e),
    };

    let criteria = match &req.criteria {
        Some(criteria) => criteria.clone(),
        None => match state.engine.criteria_for(&requester).await {
            Ok(criteria) => criteria,
            Err(e) => return error_response(e),
        },
    };

    tracing::info!(
        "Finding next candidate for requester {} ({})",
        requester.id,
        criteria.fingerprint()
    );

    match state.engine.next_candidate(&requester, &criteria).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(e),
    }
}

/// Reset the requester's seen set
///
/// POST /api/v1/discovery/reset
async fn reset_seen(
    state: web::Data<AppState>,
    req: web::Json<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.engine.reset_seen(req.requester_id).await {
        Ok(cleared) => HttpResponse::Ok().json(ResetResponse {
            requester_id: req.requester_id,
            cleared,
        }),
        Err(e) => error_response(e),
    }
}

/// Like or unlike a photo
///
/// POST /api/v1/decisions
///
/// Request body:
/// ```json
/// {
///   "requesterId": 1,
///   "candidateId": 2,
///   "photoId": 457239017,
///   "action": "like|unlike"
/// }
/// ```
async fn apply_decision(
    state: web::Data<AppState>,
    req: web::Json<DecisionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state
        .coordinator
        .apply_decision(req.requester_id, req.candidate_id, req.photo_id, req.action)
        .await
    {
        Ok(ack) => HttpResponse::Ok().json(DecisionResponse {
            requester_id: req.requester_id,
            candidate_id: req.candidate_id,
            photo_id: Some(req.photo_id),
            ack,
        }),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/decisions/skip
async fn skip_candidate(
    state: web::Data<AppState>,
    req: web::Json<CandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.coordinator.skip(req.requester_id, req.candidate_id).await {
        Ok(ack) => HttpResponse::Ok().json(DecisionResponse {
            requester_id: req.requester_id,
            candidate_id: req.candidate_id,
            photo_id: None,
            ack,
        }),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/blocks
async fn block_candidate(
    state: web::Data<AppState>,
    req: web::Json<CandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.coordinator.block(req.requester_id, req.candidate_id).await {
        Ok(newly_blocked) => HttpResponse::Ok().json(BlockResponse {
            requester_id: req.requester_id,
            candidate_id: req.candidate_id,
            newly_blocked,
        }),
        Err(e) => error_response(e),
    }
}

fn list_response(
    requester_id: UserId,
    result: Result<Vec<UserId>, DiscoveryError>,
) -> HttpResponse {
    match result {
        Ok(candidates) => HttpResponse::Ok().json(CandidateListResponse {
            requester_id,
            count: candidates.len(),
            candidates,
        }),
        Err(e) => error_response(e),
    }
}

fn update_response(
    req: &CandidateRequest,
    result: Result<bool, DiscoveryError>,
) -> HttpResponse {
    match result {
        Ok(changed) => HttpResponse::Ok().json(ListUpdateResponse {
            requester_id: req.requester_id,
            candidate_id: req.candidate_id,
            changed,
        }),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/blocks
async fn unblock_candidate(
    state: web::Data<AppState>,
    req: web::Json<CandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let result = state.coordinator.unblock(req.requester_id, req.candidate_id).await;
    update_response(&req, result)
}

/// GET /api/v1/blocks?requesterId={requesterId}
async fn get_blocked(
    state: web::Data<AppState>,
    query: web::Query<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    list_response(query.requester_id, state.coordinator.blocked(query.requester_id).await)
}

/// Save a surfaced candidate to favourites
///
/// POST /api/v1/favorites
async fn add_favorite(
    state: web::Data<AppState>,
    req: web::Json<CandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let result = state.coordinator.add_favorite(req.requester_id, req.candidate_id).await;
    update_response(&req, result)
}

/// DELETE /api/v1/favorites
async fn remove_favorite(
    state: web::Data<AppState>,
    req: web::Json<CandidateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let result = state
        .coordinator
        .remove_favorite(req.requester_id, req.candidate_id)
        .await;
    update_response(&req, result)
}

/// GET /api/v1/favorites?requesterId={requesterId}
async fn get_favorites(
    state: web::Data<AppState>,
    query: web::Query<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    list_response(query.requester_id, state.coordinator.favorites(query.requester_id).await)
}

/// Candidates with at least one liked photo
///
/// GET /api/v1/liked?requesterId={requesterId}
async fn get_liked(
    state: web::Data<AppState>,
    query: web::Query<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    list_response(query.requester_id, state.coordinator.liked(query.requester_id).await)
}

/// Save search preferences
///
/// PUT /api/v1/preferences
///
/// Request body:
/// ```json
/// {
///   "requesterId": 1,
///   "criteria": { "sex": "female", "ageFrom": 25, "ageTo": 30 }
/// }
/// ```
async fn save_preferences(
    state: web::Data<AppState>,
    req: web::Json<PreferencesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state
        .engine
        .save_preferences(req.requester_id, &req.criteria)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(PreferencesResponse {
            requester_id: req.requester_id,
            criteria: Some(req.criteria.clone()),
        }),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/preferences?requesterId={requesterId}
async fn get_preferences(
    state: web::Data<AppState>,
    query: web::Query<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    match state.engine.preferences(query.requester_id).await {
        Ok(criteria) => HttpResponse::Ok().json(PreferencesResponse {
            requester_id: query.requester_id,
            criteria,
        }),
        Err(e) => error_response(e),
    }
}

/// Get seen candidates for a requester
///
/// GET /api/v1/seen?requesterId={requesterId}
///
/// Returns the candidate ids surfaced since the last reset, for diagnostics.
async fn get_seen(
    state: web::Data<AppState>,
    query: web::Query<RequesterRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    list_response(query.requester_id, state.coordinator.seen(query.requester_id).await)
}
