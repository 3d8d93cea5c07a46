use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, storage_error_response, success_paginated_response, success_response, ApiForm,
    ApiPath, ApiQuery,
};
use crate::auth::AuthContext;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_common::status::ActionStatus;
use vigia_common::types::{ActionDetail, ActionForm, FolioResponse, PreventiveAction};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ActionFilter {
    /// `draft`, `registered`, `in_process`, `completed` or `cancelled`
    #[serde(default)]
    status: Option<String>,
}

/// Registers a preventive action. Without a `folio` a timestamp folio is
/// generated.
#[utoipa::path(
    post,
    path = "/api/acciones",
    tag = "Actions",
    security(("bearer_auth" = [])),
    request_body(content = ActionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Action registered", body = FolioResponse),
        (status = 400, description = "Missing or malformed field", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 409, description = "Folio already exists", body = crate::api::ApiError)
    )
)]
async fn create_action(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiForm(form): ApiForm<ActionForm>,
) -> impl IntoResponse {
    match state.store.create_action(ctx.user_id, &form).await {
        Ok(created) => success_response(StatusCode::CREATED, &trace_id, created),
        Err(e) => storage_error_response(&trace_id, e, "Failed to create action"),
    }
}

/// Saves an incomplete action as a draft. Every field is optional.
#[utoipa::path(
    post,
    path = "/api/acciones/borrador",
    tag = "Actions",
    security(("bearer_auth" = [])),
    request_body(content = ActionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Draft saved", body = FolioResponse),
        (status = 400, description = "Malformed field", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn create_action_draft(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiForm(form): ApiForm<ActionForm>,
) -> impl IntoResponse {
    match state.store.create_action_draft(ctx.user_id, &form).await {
        Ok(created) => success_response(StatusCode::CREATED, &trace_id, created),
        Err(e) => storage_error_response(&trace_id, e, "Failed to save action draft"),
    }
}

#[utoipa::path(
    get,
    path = "/api/acciones",
    tag = "Actions",
    security(("bearer_auth" = [])),
    params(PaginationParams, ActionFilter),
    responses(
        (status = 200, description = "Action page, newest first", body = Vec<PreventiveAction>),
        (status = 400, description = "Unknown status", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn list_actions(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<PaginationParams>,
    ApiQuery(filter): ApiQuery<ActionFilter>,
) -> impl IntoResponse {
    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<ActionStatus>() {
            Ok(status) => Some(status),
            Err(msg) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
            }
        },
        None => None,
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_actions(status).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e, "Failed to count actions"),
    };
    match state.store.list_actions(status, limit, offset).await {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => storage_error_response(&trace_id, e, "Failed to list actions"),
    }
}

#[utoipa::path(
    get,
    path = "/api/acciones/{id}",
    tag = "Actions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Action id")),
    responses(
        (status = 200, description = "Action with follow-ups", body = ActionDetail),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Action not found", body = crate::api::ApiError)
    )
)]
async fn get_action(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> impl IntoResponse {
    match state.store.get_action_detail(id).await {
        Ok(detail) => success_response(StatusCode::OK, &trace_id, detail),
        Err(e) => storage_error_response(&trace_id, e, "Failed to get action"),
    }
}

pub fn action_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_action, list_actions))
        .routes(routes!(create_action_draft))
        .routes(routes!(get_action))
}
