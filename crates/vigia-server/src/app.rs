use crate::state::AppState;
use crate::{api, auth, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vigia API",
        description = "Registro y seguimiento de acciones preventivas y problemáticas sociales",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Login and logout"),
        (name = "Dashboard", description = "Dashboards and statistics"),
        (name = "Reports", description = "Report registration, search and editing"),
        (name = "Actions", description = "Preventive actions"),
        (name = "Follow-ups", description = "Commitment and action follow-ups"),
        (name = "Catalogs", description = "Reference catalogs"),
        (name = "Users", description = "User administration")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_spec) = api::public_routes().split_for_parts();
    let (login_router, login_spec) = api::auth_routes().split_for_parts();
    let (protected_router, protected_spec) = api::protected_routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(public_spec);
    merged_spec.merge(login_spec);
    merged_spec.merge(protected_spec);

    let cors = cors_layer(&state.config.cors_allowed_origins);

    public_router
        .merge(login_router)
        .merge(protected_router.layer(middleware::from_fn_with_state(
            state.clone(),
            auth::jwt_auth_middleware,
        )))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", merged_spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
