use crate::api::{storage_error_response, success_response, ApiForm, ApiJson};
use crate::auth::AuthContext;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_common::types::{
    ActionFollowUp, ActionFollowUpForm, CommitmentFollowUp, CommitmentFollowUpRequest,
};

/// Records progress on a report's commitments. 100 completes the report,
/// 1 to 99 marks it in progress, 0 leaves the status unchanged.
#[utoipa::path(
    post,
    path = "/api/seguimiento_compromiso",
    tag = "Follow-ups",
    security(("bearer_auth" = [])),
    request_body = CommitmentFollowUpRequest,
    responses(
        (status = 201, description = "Follow-up recorded", body = CommitmentFollowUp),
        (status = 400, description = "Percentage out of range", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Report not found", body = crate::api::ApiError)
    )
)]
async fn commitment_follow_up(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CommitmentFollowUpRequest>,
) -> impl IntoResponse {
    match state.store.record_commitment_follow_up(ctx.user_id, &req).await {
        Ok(follow_up) => success_response(StatusCode::CREATED, &trace_id, follow_up),
        Err(e) => storage_error_response(&trace_id, e, "Failed to record commitment follow-up"),
    }
}

/// Records a follow-up on a preventive action and moves its status.
#[utoipa::path(
    post,
    path = "/api/seguimiento_accion",
    tag = "Follow-ups",
    security(("bearer_auth" = [])),
    request_body(content = ActionFollowUpForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Follow-up recorded", body = ActionFollowUp),
        (status = 400, description = "Malformed field", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Action not found", body = crate::api::ApiError),
        (status = 409, description = "Status change not allowed", body = crate::api::ApiError)
    )
)]
async fn action_follow_up(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiForm(form): ApiForm<ActionFollowUpForm>,
) -> impl IntoResponse {
    match state.store.record_action_follow_up(ctx.user_id, &form).await {
        Ok(follow_up) => success_response(StatusCode::CREATED, &trace_id, follow_up),
        Err(e) => storage_error_response(&trace_id, e, "Failed to record action follow-up"),
    }
}

pub fn follow_up_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(commitment_follow_up))
        .routes(routes!(action_follow_up))
}
