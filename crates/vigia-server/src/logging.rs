use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error_response;
use rand::Rng;
use std::time::{Duration, Instant};

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Per-request trace id, stored in request extensions and echoed in every
/// response envelope.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

const MAX_LOGGED_BODY: usize = 200;

fn new_trace_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

/// Reuses a caller-supplied trace id when it is short and plain ASCII.
fn incoming_trace_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(TRACE_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= 64
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    usable.then(|| raw.to_string())
}

/// Bodies of these paths carry passwords and are never logged.
fn carries_credentials(path: &str) -> bool {
    path == "/login" || path.starts_with("/api/usuarios")
}

/// Log-safe preview of a body: at most `max` bytes, cut on a char boundary.
fn preview(bytes: &[u8], max: usize) -> String {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return "<non-utf8 body>".to_string();
    };
    if text.len() <= max {
        return text.to_string();
    }
    let cut = (0..=max)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

fn human_duration(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    match micros {
        0..=999 => format!("{micros}µs"),
        1_000..=999_999 => format!("{}ms", micros / 1_000),
        _ => format!("{:.1}s", elapsed.as_secs_f64()),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Reads a request body under axum's default body limit. An oversized body
/// is a 413 envelope, an unreadable one a 400.
async fn buffer_request(body: Body, trace_id: &str) -> Result<Bytes, Response> {
    Bytes::from_request(Request::new(body), &()).await.map_err(|rejection| {
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "bad_request"
        };
        tracing::warn!(trace_id = %trace_id, status = status.as_u16(), error = %rejection.body_text(), "Rejected request body");
        error_response(status, trace_id, code, &rejection.body_text())
    })
}

fn with_trace_header(mut response: Response, trace_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Request/response logging middleware.
///
/// Assigns the trace id, logs one line per request and one per response, and
/// sets the `X-Trace-Id` response header. Form and JSON bodies are previewed
/// except on credential-bearing paths; a request body over axum's default
/// limit is answered with 413 before any handler runs.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = incoming_trace_id(req.headers()).unwrap_or_else(new_trace_id);
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let path = req.uri().path().to_string();
    if path.starts_with("/docs") {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.to_string());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let redact = carries_credentials(&path);
    let req = if !redact && matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        let (parts, body) = req.into_parts();
        let bytes = match buffer_request(body, &trace_id).await {
            Ok(bytes) => bytes,
            Err(rejected) => return with_trace_header(rejected, &trace_id),
        };
        tracing::info!(
            trace_id = %trace_id,
            method = %method,
            path = %target,
            body = %preview(&bytes, MAX_LOGGED_BODY),
            ua = %user_agent,
            "--> request"
        );
        Request::from_parts(parts, Body::from(bytes))
    } else {
        tracing::info!(
            trace_id = %trace_id,
            method = %method,
            path = %target,
            ua = %user_agent,
            "--> request"
        );
        req
    };

    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = human_duration(started.elapsed());
    let status = response.status();

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to read response body");
            let failed = error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            );
            return with_trace_header(failed, &trace_id);
        }
    };

    if status.is_success() || status.is_redirection() || status.is_informational() {
        tracing::info!(
            trace_id = %trace_id,
            status = status.as_u16(),
            elapsed = %elapsed,
            "<-- response"
        );
    } else {
        let body = if !redact && is_json(&parts.headers) {
            preview(&bytes, MAX_LOGGED_BODY)
        } else {
            String::new()
        };
        if status.is_server_error() {
            tracing::error!(trace_id = %trace_id, status = status.as_u16(), elapsed = %elapsed, body = %body, "<-- response");
        } else {
            tracing::warn!(trace_id = %trace_id, status = status.as_u16(), elapsed = %elapsed, body = %body, "<-- response");
        }
    }

    with_trace_header(Response::from_parts(parts, Body::from(bytes)), &trace_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_trace_id_is_sixteen_hex_chars() {
        let id = new_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn caller_trace_id_is_reused_when_plain() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("req-42_a"));
        assert_eq!(incoming_trace_id(&headers).as_deref(), Some("req-42_a"));

        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("bad id;"));
        assert_eq!(incoming_trace_id(&headers), None);
        assert_eq!(incoming_trace_id(&HeaderMap::new()), None);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "Acción Preventiva".as_bytes();
        assert_eq!(preview(body, 4), "Acci...");
        assert_eq!(preview(body, 5), "Acci...");
        assert_eq!(preview(b"ok", 10), "ok");
        assert_eq!(preview(&[0xff, 0xfe], 10), "<non-utf8 body>");
    }

    #[test]
    fn credential_paths_are_redacted() {
        assert!(carries_credentials("/login"));
        assert!(carries_credentials("/api/usuarios"));
        assert!(carries_credentials("/api/usuarios/3"));
        assert!(!carries_credentials("/api/acciones"));
    }

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(human_duration(Duration::from_micros(250)), "250µs");
        assert_eq!(human_duration(Duration::from_micros(12_500)), "12ms");
        assert_eq!(human_duration(Duration::from_millis(2_500)), "2.5s");
    }
}
