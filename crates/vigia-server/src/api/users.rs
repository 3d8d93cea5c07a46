use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, storage_error_response, success_paginated_response, success_response, ApiJson,
    ApiPath, ApiQuery,
};
use crate::auth::{require_admin, AuthContext};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_common::types::{ActiveUserSummary, CreateUserRequest, UpdateUserRequest, User};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct UserListQuery {
    /// Also list deactivated accounts (default false)
    #[serde(default)]
    include_inactive: bool,
}

/// Lists accounts. Administrators only.
#[utoipa::path(
    get,
    path = "/api/usuarios",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams, UserListQuery),
    responses(
        (status = 200, description = "User page", body = Vec<User>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError)
    )
)]
async fn list_users(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    let limit = pagination.limit();
    let offset = pagination.offset();
    let total = match state.store.count_listed_users(query.include_inactive).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e, "Failed to count users"),
    };
    match state
        .store
        .list_users(query.include_inactive, limit, offset)
        .await
    {
        Ok(users) => {
            success_paginated_response(StatusCode::OK, &trace_id, users, total, limit, offset)
        }
        Err(e) => storage_error_response(&trace_id, e, "Failed to list users"),
    }
}

/// Creates an account. Username and email must be unused.
#[utoipa::path(
    post,
    path = "/api/usuarios",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Missing field", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError),
        (status = 409, description = "Username or email taken", body = crate::api::ApiError)
    )
)]
async fn create_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.create_user(&req).await {
        Ok(user) => success_response(StatusCode::CREATED, &trace_id, user),
        Err(e) => storage_error_response(&trace_id, e, "Failed to create user"),
    }
}

/// Any account by id, deactivated ones included.
#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError),
        (status = 404, description = "User not found", body = crate::api::ApiError)
    )
)]
async fn get_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.get_user_by_id(id).await {
        Ok(Some(user)) => success_response(StatusCode::OK, &trace_id, user),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "user not found"),
        Err(e) => storage_error_response(&trace_id, e, "Failed to get user"),
    }
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Blank required field", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError),
        (status = 404, description = "User not found", body = crate::api::ApiError),
        (status = 409, description = "Username or email taken, or last administrator demoted", body = crate::api::ApiError)
    )
)]
async fn update_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.update_user(id, ctx.user_id, &req).await {
        Ok(user) => success_response(StatusCode::OK, &trace_id, user),
        Err(e) => storage_error_response(&trace_id, e, "Failed to update user"),
    }
}

/// Deactivates an account. The row is kept and its tokens are revoked.
#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Deactivated user", body = User),
        (status = 400, description = "Cannot deactivate yourself", body = crate::api::ApiError),
        (status = 403, description = "Not an administrator", body = crate::api::ApiError),
        (status = 404, description = "User not found", body = crate::api::ApiError),
        (status = 409, description = "Last active administrator", body = crate::api::ApiError)
    )
)]
async fn deactivate_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&ctx, &trace_id) {
        return resp;
    }
    match state.store.deactivate_user(id, ctx.user_id).await {
        Ok(user) => success_response(StatusCode::OK, &trace_id, user),
        Err(e) => storage_error_response(&trace_id, e, "Failed to deactivate user"),
    }
}

/// Active accounts for assignment pickers. Open to every signed-in user.
#[utoipa::path(
    get,
    path = "/api/usuarios/activos",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active users", body = Vec<ActiveUserSummary>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn active_users(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.list_active_user_summaries().await {
        Ok(users) => success_response(StatusCode::OK, &trace_id, users),
        Err(e) => storage_error_response(&trace_id, e, "Failed to list active users"),
    }
}

pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_users, create_user))
        .routes(routes!(active_users))
        .routes(routes!(get_user, update_user, deactivate_user))
}
