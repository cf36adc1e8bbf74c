use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_body, parse_id};
use crate::api::format;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{ensure_accepts_json, AuthPrincipal, MaybePrincipal};
use crate::pagination::Paginator;
use crate::state::AppState;
use crate::store::{Entity, Kind};

use super::clients::ListQuery;

/// Input schema for create and replace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramBody {
    pub name: String,
    pub desc: String,
    pub supplies_needed: Vec<String>,
}

/// Whether the catalog is open depends on deployment policy; an
/// authenticated principal always passes.
fn ensure_catalog_access(state: &AppState, principal: &MaybePrincipal) -> Result<(), ApiError> {
    if state.config.policy.public_program_catalog || principal.0.is_some() {
        Ok(())
    } else {
        Err(ApiError::unauthorized("authentication required for the program catalog"))
    }
}

async fn load_program(state: &AppState, id: i64) -> ApiResult<Entity> {
    state
        .store
        .get(Kind::Program, id)
        .await?
        .ok_or_else(|| ApiError::not_found("invalid program id"))
}

/// GET /programs - paginated catalog listing
pub async fn list(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_catalog_access(&state, &principal)?;
    ensure_accepts_json(&headers)?;

    let paginator = Paginator::new(
        state.store.as_ref(),
        state.config.pagination.page_size,
        state.config.pagination.include_total_count,
    );
    let page = paginator.list(Kind::Program, query.cursor.as_deref()).await?;

    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::page_to_api_value(&page, Kind::Program, &base_url)).into_response())
}

/// GET /programs/:id
pub async fn get(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_catalog_access(&state, &principal)?;
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "program")?;

    let program = load_program(&state, id).await?;
    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::entity_to_api_value(&program, &base_url)).into_response())
}

/// POST /programs - programs have no owning principal, but creation still
/// requires an authenticated caller
pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(_principal): AuthPrincipal,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let body: ProgramBody = parse_body(payload)?;

    let entity = state.store.insert(Kind::Program, program_attributes(body)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": entity.id }))).into_response())
}

/// PUT /programs/:id - full overwrite of mutable attributes
pub async fn replace(
    State(state): State<AppState>,
    AuthPrincipal(_principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "program")?;
    let body: ProgramBody = parse_body(payload)?;

    let existing = load_program(&state, id).await?;
    let replacement = Entity {
        kind: Kind::Program,
        id,
        attributes: program_attributes(body),
        references: existing.references.clone(),
        version: existing.version,
    };
    state.store.put(replacement, Some(existing.version)).await?;

    let base_url = format::request_base_url(&headers, &state.config);
    let location = format::entity_url(&base_url, Kind::Program, id);
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

/// DELETE /programs/:id - no reverse index is kept, so client `programs`
/// entries naming the deleted program are left to dangle.
pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(_principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "program")?;

    load_program(&state, id).await?;
    state.store.delete(Kind::Program, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT|DELETE /programs - not allowed on the collection root
pub async fn collection_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("GET, POST")
}

fn program_attributes(body: ProgramBody) -> Map<String, Value> {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(body.name));
    attributes.insert("desc".to_string(), json!(body.desc));
    attributes.insert("suppliesNeeded".to_string(), json!(body.supplies_needed));
    attributes
}
