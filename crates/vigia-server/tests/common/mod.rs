#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use vigia_common::status::Role;
use vigia_common::types::CreateUserRequest;
use vigia_server::app;
use vigia_server::catalog_seed;
use vigia_server::config::{DatabaseConfig, ServerConfig};
use vigia_server::state::AppState;
use vigia_storage::Store;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "changeme";
pub const CLERK_USERNAME: &str = "capturista1";
pub const CLERK_PASSWORD: &str = "capturista123";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

fn user_request(username: &str, password: &str, role: Role) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        password: password.to_string(),
        email: format!("{username}@example.com"),
        first_name: "Prueba".to_string(),
        paternal_surname: username.to_string(),
        maternal_surname: None,
        phone: None,
        position: None,
        role: Some(role),
    }
}

pub async fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_string_lossy().to_string();
    let database = DatabaseConfig {
        data_dir: data_dir.clone(),
        url: None,
    };
    let store = Arc::new(Store::new(&database.connection_url(), &database.data_path()).await?);

    catalog_seed::init_default_catalogs(&store).await?;
    store
        .create_user(&user_request(
            ADMIN_USERNAME,
            ADMIN_PASSWORD,
            Role::Administrator,
        ))
        .await?;
    store
        .create_user(&user_request(CLERK_USERNAME, CLERK_PASSWORD, Role::Clerk))
        .await?;

    let config = ServerConfig {
        database,
        ..Default::default()
    };

    let state = AppState {
        store,
        start_time: Utc::now(),
        jwt_secret: Arc::new("test-secret".to_string()),
        token_expire_secs: 3600,
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

/// Sends `fields` url-encoded, the way the HTML forms post them.
pub async fn request_form(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/x-www-form-urlencoded");

    let encoded = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    let req = builder
        .body(Body::from(encoded))
        .expect("request should build");
    send(app, req).await
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

pub async fn login_as(app: &axum::Router, username: &str, password: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["err_code"], 0);
    body["data"]["access_token"]
        .as_str()
        .expect("token should exist")
        .to_string()
}

pub async fn login_and_get_token(app: &axum::Router) -> String {
    login_as(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

pub async fn clerk_token(app: &axum::Router) -> String {
    login_as(app, CLERK_USERNAME, CLERK_PASSWORD).await
}

/// Report body that passes every required-field check against the default
/// catalogs.
pub fn full_report_body() -> Value {
    json!({
        "report_type": "Acción Preventiva",
        "regional_office": "Oficina Regional Centro",
        "federal_entity": "Ciudad de México",
        "municipality": "Cuauhtémoc",
        "request_date": "2024-03-01",
        "internal_actor": "Gerencia Regional",
        "attention_type": "Reunión de trabajo",
        "issue_type": "Territorial",
        "classification_grade": "Alto",
        "commitment_date": "2024-04-15",
        "requester": "Comité vecinal",
        "event_description": "Bloqueo de acceso a instalación",
        "commitments": "Mesa de diálogo semanal"
    })
}

pub fn full_action_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("registration_date", "2024-03-01"),
        ("region", "Norte"),
        ("asset", "Activo Burgos"),
        ("facility", "Estación de compresión 3"),
        ("state", "Tamaulipas"),
        ("municipality", "Reynosa"),
        ("locality", "Ejido La Esperanza"),
        ("coordinate_x", "-98.2975"),
        ("coordinate_y", "26.0806"),
        ("issue_type", "Territorial"),
        ("issue_description", "Reclamo por paso de ducto"),
        ("social_actor", "Ejidatarios"),
        ("impact_level", "Alto"),
        ("preventive_action", "Mesa de diálogo con autoridades ejidales"),
        ("start_date", "2024-03-05"),
        ("end_date", "2024-06-30"),
        ("budget", "150000.50"),
        ("responsible", "Ing. Ramírez"),
        ("responsible_area", "Relaciones Institucionales"),
    ]
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["success"], true);
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["success"], false);
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
