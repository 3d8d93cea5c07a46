use crate::api::{storage_error_response, success_response};
use crate::auth::{require_admin, AuthContext};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Local;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_common::types::{AdminDashboard, AdminStats, DashboardSummary};

/// Report and action totals plus the latest entries of each.
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn dashboard(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.dashboard_summary(Local::now().date_naive()).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => storage_error_response(&trace_id, e, "Failed to build dashboard"),
    }
}

/// Action statistics for administrators, including overdue actions and a
/// six-month trend.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Administrator dashboard", body = AdminDashboard),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError)
    )
)]
async fn admin_dashboard(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.admin_dashboard(Local::now().date_naive()).await {
        Ok(data) => success_response(StatusCode::OK, &trace_id, data),
        Err(e) => storage_error_response(&trace_id, e, "Failed to build admin dashboard"),
    }
}

#[utoipa::path(
    get,
    path = "/api/estadisticas-admin",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Administrator counters", body = AdminStats),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError)
    )
)]
async fn admin_stats(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.admin_stats(Local::now().date_naive()).await {
        Ok(stats) => success_response(StatusCode::OK, &trace_id, stats),
        Err(e) => storage_error_response(&trace_id, e, "Failed to compute admin stats"),
    }
}

pub fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(dashboard))
        .routes(routes!(admin_dashboard))
        .routes(routes!(admin_stats))
}
