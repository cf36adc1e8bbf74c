use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{find_user_by_email, parse_body, parse_id};
use crate::api::format;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{ensure_accepts_json, AuthPrincipal};
use crate::pagination::Paginator;
use crate::relationship::RelationshipMaintainer;
use crate::state::AppState;
use crate::store::entity::{relation, OWNER_FIELD};
use crate::store::{Entity, Kind, RefEntry};

/// Input schema for create and replace.
#[derive(Debug, Deserialize)]
pub struct ClientBody {
    pub name: String,
    pub diagnosis: String,
    pub age: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub cursor: Option<String>,
}

/// Only the owning principal may read or mutate a client.
fn ensure_owner(client: &Entity, principal: &Principal) -> Result<(), ApiError> {
    match client.attr_str(OWNER_FIELD) {
        Some(owner) if owner == principal.identity => Ok(()),
        _ => Err(ApiError::forbidden("current user does not own this client")),
    }
}

async fn load_client(state: &AppState, id: i64) -> ApiResult<Entity> {
    state
        .store
        .get(Kind::Client, id)
        .await?
        .ok_or_else(|| ApiError::not_found("invalid client id"))
}

/// GET /clients - paginated listing, no auth required
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;

    let paginator = Paginator::new(
        state.store.as_ref(),
        state.config.pagination.page_size,
        state.config.pagination.include_total_count,
    );
    let page = paginator.list(Kind::Client, query.cursor.as_deref()).await?;

    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::page_to_api_value(&page, Kind::Client, &base_url)).into_response())
}

/// GET /clients/:id - owner-only read
pub async fn get(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "client")?;

    let client = load_client(&state, id).await?;
    ensure_owner(&client, &principal)?;

    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::entity_to_api_value(&client, &base_url)).into_response())
}

/// POST /clients - ownership is assigned to the creating principal
pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let body: ClientBody = parse_body(payload)?;

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(body.name));
    attributes.insert("diagnosis".to_string(), json!(body.diagnosis));
    attributes.insert("age".to_string(), json!(body.age));
    attributes.insert(OWNER_FIELD.to_string(), json!(principal.identity));

    let entity = state.store.insert(Kind::Client, attributes).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": entity.id }))).into_response())
}

/// PUT /clients/:id - full overwrite of mutable attributes. The id, the
/// owner field, and embedded reference lists are server-controlled and
/// survive the replace.
pub async fn replace(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "client")?;
    let body: ClientBody = parse_body(payload)?;

    let existing = load_client(&state, id).await?;
    ensure_owner(&existing, &principal)?;

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(body.name));
    attributes.insert("diagnosis".to_string(), json!(body.diagnosis));
    attributes.insert("age".to_string(), json!(body.age));
    attributes.insert(OWNER_FIELD.to_string(), json!(principal.identity));

    let replacement = Entity {
        kind: Kind::Client,
        id,
        attributes,
        references: existing.references.clone(),
        version: existing.version,
    };
    state.store.put(replacement, Some(existing.version)).await?;

    let base_url = format::request_base_url(&headers, &state.config);
    let location = format::entity_url(&base_url, Kind::Client, id);
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

/// DELETE /clients/:id - owner-only. Afterwards the client id is unlinked
/// from the deleting principal's own User record; other Users are not
/// searched.
pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    ensure_accepts_json(&headers)?;
    let id = parse_id(&id, "client")?;

    let client = load_client(&state, id).await?;
    ensure_owner(&client, &principal)?;

    state.store.delete(Kind::Client, id).await?;

    if let Some(user) = find_user_by_email(state.store.as_ref(), &principal.identity).await? {
        RelationshipMaintainer::new(state.store.as_ref())
            .unlink(Kind::User, user.id, relation::CLIENTS, id)
            .await?;
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT /clients/:client_id/programs/:program_id - enroll a client in a
/// program. The client must exist and belong to the caller; the program must
/// exist. Repeated links append duplicate entries.
pub async fn link_program(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((client_id, program_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let client_id = parse_id(&client_id, "client")?;
    let program_id = parse_id(&program_id, "program")?;

    let client = load_client(&state, client_id).await?;
    ensure_owner(&client, &principal)?;

    state
        .store
        .get(Kind::Program, program_id)
        .await?
        .ok_or_else(|| ApiError::not_found("invalid program id"))?;

    let base_url = format::request_base_url(&headers, &state.config);
    let entry = RefEntry::new(program_id, format::entity_url(&base_url, Kind::Program, program_id));
    RelationshipMaintainer::new(state.store.as_ref())
        .link(Kind::Client, client_id, relation::PROGRAMS, entry)
        .await?;

    Ok(Json(json!({ "message": "program added to client" })).into_response())
}

/// DELETE /clients/:client_id/programs/:program_id - idempotent unlink.
pub async fn unlink_program(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((client_id, program_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let client_id = parse_id(&client_id, "client")?;
    let program_id = parse_id(&program_id, "program")?;

    let client = load_client(&state, client_id).await?;
    ensure_owner(&client, &principal)?;

    state
        .store
        .get(Kind::Program, program_id)
        .await?
        .ok_or_else(|| ApiError::not_found("invalid program id"))?;

    RelationshipMaintainer::new(state.store.as_ref())
        .unlink(Kind::Client, client_id, relation::PROGRAMS, program_id)
        .await?;

    Ok(Json(json!({ "message": "program removed from client" })).into_response())
}

/// PUT|DELETE /clients - not allowed on the collection root
pub async fn collection_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("GET, POST")
}
