//! Competition API handlers.
//!
//! Mutating endpoints require the `X-User-Id` header; reads are public so
//! scoreboards and projector screens can poll them.
//!
//! # Examples
//!
//! Start an event:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/events/spring-open/start \
//!   -H "X-User-Id: organizer-1"
//! ```
//!
//! Close heat 0 of a bracket:
//! ```bash
//! curl -X POST \
//!   http://localhost:8080/api/v1/events/spring-open/brackets/Salsa_Adult_Women/heats/0/finalize \
//!   -H "X-User-Id: judge-7"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use dance_live::competition::{Bracket, BracketStatus, EventStatus, Heat};
use dance_live::{Actor, CompetitionError, EventProgress, HeatPlan};
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StartEventResponse {
    pub event_id: String,
    pub brackets: Vec<Bracket>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmHeatsResponse {
    pub bracket_id: String,
    pub heats: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// HTTP status for an engine error
pub fn status_for(err: &CompetitionError) -> StatusCode {
    match err {
        CompetitionError::EventNotFound(_)
        | CompetitionError::BracketNotFound(_)
        | CompetitionError::HeatNotFound { .. } => StatusCode::NOT_FOUND,
        CompetitionError::InvalidState { .. } | CompetitionError::AlreadyGenerated(_) => {
            StatusCode::CONFLICT
        }
        CompetitionError::NoParticipants(_) | CompetitionError::PreconditionFailed(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CompetitionError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CompetitionError::Database(_)
        | CompetitionError::Serialization(_)
        | CompetitionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(err: &CompetitionError) -> &'static str {
    match err {
        CompetitionError::InvalidState { .. } => "invalid_state",
        CompetitionError::EventNotFound(_)
        | CompetitionError::BracketNotFound(_)
        | CompetitionError::HeatNotFound { .. } => "not_found",
        CompetitionError::NoParticipants(_) => "no_participants",
        CompetitionError::AlreadyGenerated(_) => "already_generated",
        CompetitionError::PreconditionFailed(_) => "precondition_failed",
        CompetitionError::Forbidden { .. } => "forbidden",
        CompetitionError::Database(_)
        | CompetitionError::Serialization(_)
        | CompetitionError::Storage(_) => "internal",
    }
}

fn error_response(err: CompetitionError) -> ApiError {
    let status = status_for(&err);
    metrics::competition_errors_total(error_kind(&err));

    match &err {
        CompetitionError::Forbidden { user_id, action } => logging::log_forbidden(user_id, action),
        _ if status.is_server_error() => tracing::error!("Competition call failed: {}", err),
        _ => tracing::debug!("Competition call rejected: {}", err),
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Start a pending event.
///
/// # Response
///
/// Returns `200 OK` with the created brackets, the first one already active.
///
/// # Errors
///
/// - `403 Forbidden`: Caller may not manage the event
/// - `404 Not Found`: Event doesn't exist
/// - `409 Conflict`: Event is not pending
/// - `422 Unprocessable Entity`: No registered participants
pub async fn start_event(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(event_id): Path<String>,
) -> ApiResult<StartEventResponse> {
    let brackets = state
        .manager
        .start_event(&actor, &event_id)
        .await
        .map_err(error_response)?;

    metrics::events_started_total();
    metrics::brackets_created_total(brackets.len());
    info!(event_id = %event_id, user_id = %actor.user_id, "Event started");

    Ok(Json(StartEventResponse { event_id, brackets }))
}

pub async fn event_progress(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<EventProgress> {
    state
        .manager
        .event_progress(&event_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Brackets in activation order
pub async fn list_brackets(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Vec<Bracket>> {
    state
        .manager
        .list_brackets(&event_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Preview heats for a bracket. Nothing is stored until the plan is confirmed.
///
/// # Errors
///
/// - `409 Conflict`: Heats already exist, or the bracket is not open
/// - `422 Unprocessable Entity`: Registrations changed since the event started
pub async fn plan_heats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((event_id, bracket_id)): Path<(String, String)>,
) -> ApiResult<HeatPlan> {
    state
        .manager
        .plan_heats(&actor, &event_id, &bracket_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Persist a plan returned by [`plan_heats`].
///
/// # Request Body
///
/// The `HeatPlan` JSON exactly as returned by the plan endpoint.
///
/// # Response
///
/// Returns `201 Created` with the number of stored heats.
pub async fn confirm_heats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((event_id, bracket_id)): Path<(String, String)>,
    Json(plan): Json<HeatPlan>,
) -> Result<(StatusCode, Json<ConfirmHeatsResponse>), ApiError> {
    if plan.event_id != event_id || plan.bracket_id != bracket_id {
        return Err(error_response(CompetitionError::PreconditionFailed(format!(
            "plan is for {}/{}, not {}/{}",
            plan.event_id, plan.bracket_id, event_id, bracket_id
        ))));
    }

    let heats = plan.heats.len();
    state
        .manager
        .confirm_heats(&actor, plan)
        .await
        .map_err(error_response)?;

    metrics::heats_generated_total(heats);
    Ok((
        StatusCode::CREATED,
        Json(ConfirmHeatsResponse { bracket_id, heats }),
    ))
}

pub async fn list_heats(
    State(state): State<AppState>,
    Path((event_id, bracket_id)): Path<(String, String)>,
) -> ApiResult<Vec<Heat>> {
    state
        .manager
        .list_heats(&event_id, &bracket_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_heat(
    State(state): State<AppState>,
    Path((event_id, bracket_id, index)): Path<(String, String, u32)>,
) -> ApiResult<Heat> {
    state
        .manager
        .current_heat(&event_id, &bracket_id, index)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Close a heat. Safe to retry.
///
/// # Response
///
/// Returns `200 OK` with the updated bracket. When the last heat closes the
/// bracket is `completed` and the event has moved on to its next bracket.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither a manager nor a judge of the event
/// - `409 Conflict`: Bracket has not been activated yet
/// - `422 Unprocessable Entity`: Heat index out of range
pub async fn finalize_heat(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((event_id, bracket_id, index)): Path<(String, String, u32)>,
) -> ApiResult<Bracket> {
    let before = state
        .manager
        .get_bracket(&event_id, &bracket_id)
        .await
        .map_err(error_response)?;

    let bracket = state
        .manager
        .finalize_heat(&actor, &event_id, &bracket_id, index)
        .await
        .map_err(error_response)?;

    if bracket.completed_heats > before.completed_heats {
        metrics::heats_finalized_total();
    }

    if before.status != BracketStatus::Completed && bracket.status == BracketStatus::Completed {
        metrics::brackets_completed_total();
        let event = state
            .manager
            .get_event(&event_id)
            .await
            .map_err(error_response)?;
        if event.status == EventStatus::Completed {
            metrics::events_completed_total();
            info!(event_id = %event_id, "Event completed");
        }
    }

    Ok(Json(bracket))
}
