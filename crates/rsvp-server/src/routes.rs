use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use rsvp_core::domain::{RsvpSubmission, SubmitterMetadata};
use rsvp_core::dto::{RsvpConfirmationDto, RsvpStatsDto, RsvpSummaryDto};
use rsvp_core::time::now_utc;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use validator::Validate;

use crate::error::{self, ApiError};
use crate::state::AppState;
use crate::validation;

pub const LIVENESS_MESSAGE: &str = "Wedding Invitation API - Hello World";

pub fn router(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    with_layers(api_routes(&prefix)).with_state(state)
}

pub(crate) fn api_routes(prefix: &str) -> Router<AppState> {
    let mut routes = Router::new()
        .route(
            &root_path(prefix),
            get(root).fallback(error::method_not_allowed),
        )
        .route(
            &format!("{prefix}/rsvp"),
            post(submit_rsvp)
                .get(list_rsvps)
                .fallback(error::method_not_allowed),
        )
        .route(
            &format!("{prefix}/rsvp/stats"),
            get(rsvp_stats).fallback(error::method_not_allowed),
        );

    if !prefix.is_empty() {
        routes = routes.route(
            &format!("{prefix}/"),
            get(root).fallback(error::method_not_allowed),
        );
    }

    routes
}

pub(crate) fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    routes
        .fallback(error::not_found)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Any origin, method and header, with credentials. Browsers refuse `*`
/// alongside credentials, so the request values are mirrored back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn root_path(prefix: &str) -> String {
    if prefix.is_empty() {
        "/".to_string()
    } else {
        prefix.to_string()
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: LIVENESS_MESSAGE,
    })
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RsvpRequest {
    #[validate(length(max = 100, message = "Name must be less than 100 characters"))]
    name: String,
    attending: bool,
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    comment: Option<String>,
}

async fn submit_rsvp(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<RsvpRequest>, JsonRejection>,
) -> Result<Json<RsvpConfirmationDto>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    validation::validate(&payload)?;

    let submission =
        RsvpSubmission::new(&payload.name, payload.attending, payload.comment.as_deref())?;
    let metadata = submitter_metadata(connect_info, &headers);

    let outcome = state
        .rsvps
        .submit(now_utc(), submission, metadata)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to save rsvp");
            ApiError::internal()
        })?;

    info!(
        outcome = outcome.as_str(),
        id = %outcome.record().id,
        attending = outcome.record().attending,
        "rsvp saved"
    );
    Ok(Json(RsvpConfirmationDto::from(outcome)))
}

async fn list_rsvps(State(state): State<AppState>) -> Result<Json<RsvpSummaryDto>, ApiError> {
    let summary = state.rsvps.list_all().await.map_err(|err| {
        error!(error = %err, "failed to fetch rsvps");
        ApiError::Internal("Failed to fetch RSVPs")
    })?;
    Ok(Json(RsvpSummaryDto::new(summary.records, summary.counts)))
}

async fn rsvp_stats(State(state): State<AppState>) -> Result<Json<RsvpStatsDto>, ApiError> {
    let counts = state.rsvps.stats().await.map_err(|err| {
        error!(error = %err, "failed to fetch rsvp stats");
        ApiError::Internal("Failed to fetch statistics")
    })?;
    Ok(Json(RsvpStatsDto::new(
        counts,
        state.config.audience_baseline,
    )))
}

fn submitter_metadata(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> SubmitterMetadata {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    SubmitterMetadata {
        ip_address: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent,
    }
}
