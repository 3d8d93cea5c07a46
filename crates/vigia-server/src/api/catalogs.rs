use crate::api::{storage_error_response, success_response, ApiPath, ApiQuery};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigia_common::status::CatalogKind;
use vigia_common::types::CatalogItem;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct EntityQuery {
    /// Only entities of this regional office
    #[serde(default)]
    oficina_regional_id: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct StatusGroupQuery {
    /// `report`, `compliance` or `probability`
    #[serde(default)]
    grupo: Option<String>,
}

async fn list_kind(
    state: &AppState,
    trace_id: &str,
    kind: CatalogKind,
    parent_id: Option<i32>,
    group_key: Option<&str>,
) -> Response {
    match state.store.list_catalog(kind, parent_id, group_key).await {
        Ok(items) => success_response(StatusCode::OK, trace_id, items),
        Err(e) => storage_error_response(trace_id, e, "Failed to list catalog"),
    }
}

#[utoipa::path(
    get,
    path = "/api/catalogos/oficinas_regionales",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Regional offices", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn regional_offices(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::RegionalOffice, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/tipos_reporte",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Report types", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn report_types(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::ReportType, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/entidades_federativas",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    params(EntityQuery),
    responses(
        (status = 200, description = "Federal entities", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn federal_entities(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EntityQuery>,
) -> impl IntoResponse {
    list_kind(
        &state,
        &trace_id,
        CatalogKind::FederalEntity,
        query.oficina_regional_id,
        None,
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/municipios/{entidad_id}",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    params(("entidad_id" = i32, Path, description = "Federal entity id")),
    responses(
        (status = 200, description = "Municipalities of the entity", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn municipalities(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiPath(entidad_id): ApiPath<i32>,
) -> impl IntoResponse {
    list_kind(
        &state,
        &trace_id,
        CatalogKind::Municipality,
        Some(entidad_id),
        None,
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/actores_internos",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Internal actors", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn internal_actors(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::InternalActor, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/tipos_atencion",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Attention types", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn attention_types(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::AttentionType, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/tipos_problematica",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Issue types", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn issue_types(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::IssueType, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/grados_clasificacion",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Classification grades", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn classification_grades(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    list_kind(&state, &trace_id, CatalogKind::ClassificationGrade, None, None).await
}

#[utoipa::path(
    get,
    path = "/api/catalogos/estatus_generales",
    tag = "Catalogs",
    security(("bearer_auth" = [])),
    params(StatusGroupQuery),
    responses(
        (status = 200, description = "General statuses", body = Vec<CatalogItem>),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn general_statuses(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusGroupQuery>,
) -> impl IntoResponse {
    let group = query.grupo.as_deref().map(str::trim).filter(|g| !g.is_empty());
    list_kind(&state, &trace_id, CatalogKind::GeneralStatus, None, group).await
}

pub fn catalog_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(regional_offices))
        .routes(routes!(report_types))
        .routes(routes!(federal_entities))
        .routes(routes!(municipalities))
        .routes(routes!(internal_actors))
        .routes(routes!(attention_types))
        .routes(routes!(issue_types))
        .routes(routes!(classification_grades))
        .routes(routes!(general_statuses))
}
