use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, storage_error_response, success_paginated_response, success_response, ApiJson,
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
use vigia_common::status::ReportStatus;
use vigia_common::types::{
    EditHistoryEntry, FolioResponse, RegisterReportRequest, Report, ReportDetail,
    UpdateReportRequest,
};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ReportFilter {
    /// `draft`, `registered`, `in_progress` or `completed`
    #[serde(default)]
    status: Option<String>,
}

/// Registers a report or, with `save_as_draft`, a draft. Catalog values are
/// given by name and the folio is assigned by the server.
#[utoipa::path(
    post,
    path = "/api/registro_reporte",
    tag = "Reports",
    security(("bearer_auth" = [])),
    request_body = RegisterReportRequest,
    responses(
        (status = 201, description = "Report registered", body = FolioResponse),
        (status = 400, description = "Missing or malformed field", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Catalog value not found", body = crate::api::ApiError)
    )
)]
async fn register_report(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterReportRequest>,
) -> impl IntoResponse {
    match state.store.register_report(ctx.user_id, &req).await {
        Ok(created) => success_response(StatusCode::CREATED, &trace_id, created),
        Err(e) => storage_error_response(&trace_id, e, "Failed to register report"),
    }
}

/// Paginated reports, newest first.
#[utoipa::path(
    get,
    path = "/api/reportes",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(PaginationParams, ReportFilter),
    responses(
        (status = 200, description = "Report page", body = Vec<Report>),
        (status = 400, description = "Unknown status", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn list_reports(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<PaginationParams>,
    ApiQuery(filter): ApiQuery<ReportFilter>,
) -> impl IntoResponse {
    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<ReportStatus>() {
            Ok(status) => Some(status),
            Err(msg) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
            }
        },
        None => None,
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_reports(status).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e, "Failed to count reports"),
    };
    match state.store.list_reports(status, limit, offset).await {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => storage_error_response(&trace_id, e, "Failed to list reports"),
    }
}

/// Edits narrative fields. Every changed field is written to the edit
/// history.
#[utoipa::path(
    put,
    path = "/api/reportes/{id}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Report id")),
    request_body = UpdateReportRequest,
    responses(
        (status = 200, description = "Updated report", body = Report),
        (status = 400, description = "Malformed field", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Report not found", body = crate::api::ApiError)
    )
)]
async fn update_report(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateReportRequest>,
) -> impl IntoResponse {
    match state.store.update_report(id, ctx.user_id, &req).await {
        Ok(report) => success_response(StatusCode::OK, &trace_id, report),
        Err(e) => storage_error_response(&trace_id, e, "Failed to update report"),
    }
}

#[utoipa::path(
    get,
    path = "/api/reportes/{id}/historial",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Report id")),
    responses(
        (status = 200, description = "Edit history, oldest first", body = Vec<EditHistoryEntry>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "Report not found", body = crate::api::ApiError)
    )
)]
async fn report_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> impl IntoResponse {
    match state.store.list_edit_history(id).await {
        Ok(entries) => success_response(StatusCode::OK, &trace_id, entries),
        Err(e) => storage_error_response(&trace_id, e, "Failed to list edit history"),
    }
}

/// Looks a report up by folio, with its commitment follow-ups.
#[utoipa::path(
    get,
    path = "/api/buscar_reporte/{folio}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("folio" = String, Path, description = "Report folio, e.g. ORC-AP-001")),
    responses(
        (status = 200, description = "Report with follow-ups", body = ReportDetail),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 404, description = "No report with that folio", body = crate::api::ApiError)
    )
)]
async fn find_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiPath(folio): ApiPath<String>,
) -> impl IntoResponse {
    match state.store.find_report_by_folio(folio.trim()).await {
        Ok(detail) => success_response(StatusCode::OK, &trace_id, detail),
        Err(e) => storage_error_response(&trace_id, e, "Failed to look up report"),
    }
}

pub fn report_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(register_report))
        .routes(routes!(list_reports))
        .routes(routes!(update_report))
        .routes(routes!(report_history))
        .routes(routes!(find_report))
}
