use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use vigia_common::status::Role;
use vigia_common::types::{LoginRequest, LoginResponse, User};
use vigia_storage::auth::verify_password;

use crate::api::{error_response, success_empty_response, success_response, FormOrJson};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub display_name: String,
    /// Must match the account's current version
    pub token_version: i32,
    pub iat: u64,
    pub exp: u64,
}

/// Identity of the caller, inserted by [`jwt_auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    pub display_name: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

pub fn create_token(secret: &str, user: &User, expire_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        display_name: user.display_name(),
        token_version: user.token_version,
        iat: now,
        exp: now + expire_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// 403 unless the caller is an administrator.
pub fn require_admin(ctx: &AuthContext, trace_id: &str) -> Result<(), Response> {
    if ctx.is_admin() {
        Ok(())
    } else {
        tracing::warn!(trace_id = %trace_id, user_id = ctx.user_id, "Administrator role required");
        Err(error_response(
            StatusCode::FORBIDDEN,
            trace_id,
            "forbidden",
            "administrator role required",
        ))
    }
}

fn unauthorized(trace_id: &str, msg: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, trace_id, "unauthorized", msg)
}

/// Bearer-token gate for protected routes.
///
/// The token must verify, and the account it names must still be active
/// with an unchanged `token_version`.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        None => return unauthorized(&trace_id, "missing authorization header"),
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => token,
            _ => return unauthorized(&trace_id, "invalid authorization header"),
        },
    };

    let claims = match validate_token(&state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "token_expired",
                "token expired",
            );
        }
        Err(_) => return unauthorized(&trace_id, "invalid token"),
    };

    let Ok(user_id) = claims.sub.parse::<i32>() else {
        return unauthorized(&trace_id, "invalid token");
    };
    let user = match state.store.get_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized(&trace_id, "invalid token"),
        Err(e) => {
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to load token user");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            );
        }
    };
    if !user.active {
        return unauthorized(&trace_id, "account is deactivated");
    }
    if user.token_version != claims.token_version {
        return unauthorized(&trace_id, "token has been revoked");
    }

    req.extensions_mut().insert(AuthContext {
        display_name: user.display_name(),
        user_id: user.id,
        username: user.username,
        role: user.role,
    });
    next.run(req).await
}

/// Signs in with username and password, sent as a form or as JSON.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body(
        content = LoginRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing fields", body = crate::api::ApiError),
        (status = 401, description = "Bad credentials or inactive account", body = crate::api::ApiError)
    )
)]
pub async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    FormOrJson(req): FormOrJson<LoginRequest>,
) -> impl IntoResponse {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "username and password are required",
        );
    }

    let user = match state.store.get_user_by_username(username).await {
        Ok(Some(u)) => u,
        Ok(None) => return unauthorized(&trace_id, "invalid credentials"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to query user");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            );
        }
    };

    if !verify_password(&req.password, &user.password_hash) {
        tracing::warn!(username = %username, "Login failed: bad password");
        return unauthorized(&trace_id, "invalid credentials");
    }
    if !user.active {
        tracing::warn!(username = %username, "Login refused: account deactivated");
        return unauthorized(&trace_id, "account is deactivated");
    }

    match create_token(&state.jwt_secret, &user, state.token_expire_secs) {
        Ok(token) => {
            tracing::info!(user_id = user.id, role = %user.role, "User signed in");
            success_response(
                StatusCode::OK,
                &trace_id,
                LoginResponse {
                    access_token: token,
                    expires_in: state.token_expire_secs,
                    role: user.role,
                    display_name: user.display_name(),
                    redirect: user.role.home_path().to_string(),
                },
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// Revokes every token issued to the caller, including the current one.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
pub async fn logout(
    Extension(trace_id): Extension<TraceId>,
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.bump_token_version(ctx.user_id).await {
        Ok(()) => {
            tracing::info!(user_id = ctx.user_id, "User signed out");
            success_empty_response(StatusCode::OK, &trace_id, "signed out")
        }
        Err(e) => crate::api::storage_error_response(&trace_id, e, "Failed to sign out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "mlopez".to_string(),
            email: "mlopez@example.com".to_string(),
            first_name: "María".to_string(),
            paternal_surname: "López".to_string(),
            maternal_surname: None,
            phone: None,
            position: None,
            role: Role::Administrator,
            active: true,
            password_hash: String::new(),
            token_version: 3,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_carries_identity() {
        let token = create_token("secret", &sample_user(), 60).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::Administrator);
        assert_eq!(claims.display_name, "María López");
        assert_eq!(claims.token_version, 3);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("secret", &sample_user(), 60).unwrap();
        assert!(validate_token("other", &token).is_err());
    }

    #[test]
    fn clerk_is_not_admin() {
        let ctx = AuthContext {
            user_id: 1,
            username: "c".to_string(),
            role: Role::Clerk,
            display_name: "C".to_string(),
        };
        assert!(require_admin(&ctx, "t").is_err());
    }
}
