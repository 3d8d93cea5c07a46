pub mod actions;
pub mod catalogs;
pub mod dashboard;
pub mod follow_ups;
pub mod pagination;
pub mod reports;
pub mod users;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Extension, FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_storage::StorageError;

/// Error envelope, as documented in the OpenAPI spec.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Always false
    pub success: bool,
    /// Numeric error code
    pub err_code: i32,
    /// Human-readable message
    pub err_msg: String,
    /// Request trace id
    pub trace_id: String,
}

/// Response envelope shared by every JSON endpoint.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    /// 0 on success
    pub err_code: i32,
    /// `success` unless an explicit message is given
    pub err_msg: String,
    pub trace_id: String,
    /// Payload, null on error
    pub data: Option<T>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            success: true,
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            success: true,
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "token_expired" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "forbidden" => 1006,
        "payload_too_large" => 1007,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            success: false,
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Maps a storage failure onto the error envelope. Client errors echo the
/// storage message; database and hashing failures are logged and hidden.
pub fn storage_error_response(trace_id: &str, err: StorageError, context: &str) -> Response {
    match err {
        StorageError::Validation(msg) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", &msg)
        }
        e @ StorageError::NotFound { .. } => {
            error_response(StatusCode::NOT_FOUND, trace_id, "not_found", &e.to_string())
        }
        StorageError::Conflict(msg) => {
            error_response(StatusCode::CONFLICT, trace_id, "conflict", &msg)
        }
        e @ StorageError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, trace_id, "conflict", &e.to_string())
        }
        e => {
            tracing::error!(trace_id = %trace_id, error = %e, "{context}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "internal_error",
                "internal error",
            )
        }
    }
}

fn request_trace_id(req: &Request) -> String {
    req.extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

/// JSON body whose rejection is a 400 envelope instead of axum's plain text.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = request_trace_id(&req);
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&trace_id, rejection)),
        }
    }
}

/// Url-encoded body whose rejection is a 400 envelope.
pub struct ApiForm<T>(pub T);

impl<S, T> FromRequest<S> for ApiForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = request_trace_id(&req);
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(Self(value)),
            Err(rejection) => Err(form_rejection(&trace_id, rejection)),
        }
    }
}

/// Accepts either a url-encoded form or JSON, chosen by `Content-Type`.
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            ApiJson::<T>::from_request(req, state)
                .await
                .map(|ApiJson(v)| Self(v))
        } else {
            ApiForm::<T>::from_request(req, state)
                .await
                .map(|ApiForm(v)| Self(v))
        }
    }
}

/// Error code key for an extractor rejection status.
fn rejection_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        s if s.is_server_error() => "internal_error",
        _ => "bad_request",
    }
}

fn rejection_response(trace_id: &str, status: StatusCode, text: String, what: &str) -> Response {
    tracing::warn!(trace_id = %trace_id, status = status.as_u16(), error = %text, "Rejected {what}");
    error_response(status, trace_id, rejection_code(status), &text)
}

fn json_rejection(trace_id: &str, rejection: JsonRejection) -> Response {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    rejection_response(trace_id, status, rejection.body_text(), "JSON body")
}

fn form_rejection(trace_id: &str, rejection: FormRejection) -> Response {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    rejection_response(trace_id, status, rejection.body_text(), "form body")
}

fn parts_trace_id(parts: &Parts) -> String {
    parts
        .extensions
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

/// Path parameters whose rejection is an error envelope.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_response(
                &parts_trace_id(parts),
                rejection.status(),
                rejection.body_text(),
                "path parameters",
            )),
        }
    }
}

/// Query string whose rejection is a 400 envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_response(
                &parts_trace_id(parts),
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
                "query string",
            )),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    storage_status: String,
}

/// Liveness probe. No token required.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.store.count_users().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Health check query failed");
            "error"
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: storage_status.to_string(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}

pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(crate::auth::login))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(crate::auth::logout))
        .merge(dashboard::dashboard_routes())
        .merge(reports::report_routes())
        .merge(actions::action_routes())
        .merge(follow_ups::follow_up_routes())
        .merge(catalogs::catalog_routes())
        .merge(users::user_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn storage_errors_map_to_status_and_code() {
        let cases = [
            (
                StorageError::Validation("folio is required".to_string()),
                StatusCode::BAD_REQUEST,
                1001,
            ),
            (
                StorageError::not_found("report", "ORC-AP-404"),
                StatusCode::NOT_FOUND,
                1004,
            ),
            (
                StorageError::Conflict("email taken".to_string()),
                StatusCode::CONFLICT,
                1005,
            ),
            (
                StorageError::InvalidTransition {
                    entity: "preventive action",
                    from: "completed".to_string(),
                    to: "registered".to_string(),
                },
                StatusCode::CONFLICT,
                1005,
            ),
            (
                StorageError::UnexpectedValue {
                    column: "users.role",
                    value: "root".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                1500,
            ),
        ];
        for (err, status, code) in cases {
            let resp = storage_error_response("abc", err, "test");
            assert_eq!(resp.status(), status);
            let json = body_json(resp).await;
            assert_eq!(json["success"], false);
            assert_eq!(json["err_code"], code);
            assert_eq!(json["trace_id"], "abc");
            assert!(json["data"].is_null());
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let resp = storage_error_response(
            "t",
            StorageError::UnexpectedValue {
                column: "users.role",
                value: "root".to_string(),
            },
            "test",
        );
        let json = body_json(resp).await;
        assert_eq!(json["err_msg"], "internal error");
    }

    #[tokio::test]
    async fn paginated_envelope_shape() {
        let resp = success_paginated_response(StatusCode::OK, "t", vec![1, 2], 7, 2, 4);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["err_code"], 0);
        assert_eq!(json["err_msg"], "success");
        assert_eq!(json["data"]["items"], serde_json::json!([1, 2]));
        assert_eq!(json["data"]["total"], 7);
        assert_eq!(json["data"]["limit"], 2);
        assert_eq!(json["data"]["offset"], 4);
    }
}
