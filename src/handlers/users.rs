use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_body, parse_id};
use crate::api::format;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthPrincipal, MaybePrincipal};
use crate::pagination::Paginator;
use crate::relationship::RelationshipMaintainer;
use crate::state::AppState;
use crate::store::entity::{relation, EMAIL_FIELD, OWNER_FIELD};
use crate::store::{Entity, Kind, RefEntry};

use super::clients::ListQuery;

/// Input schema for replace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub name: String,
    pub email: String,
    pub client_age: u32,
}

/// Input schema for signup. `username` doubles as the provider account email
/// and the stored `email` attribute.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupBody {
    pub name: String,
    pub username: String,
    pub password: String,
    pub client_age: u32,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

/// A User record is only visible to the principal it describes.
fn ensure_same_identity(user: &Entity, principal: &Principal) -> Result<(), ApiError> {
    match user.attr_str(EMAIL_FIELD) {
        Some(email) if email == principal.identity => Ok(()),
        _ => Err(ApiError::forbidden("current user does not have permission to view this user")),
    }
}

async fn load_user(state: &AppState, id: i64) -> ApiResult<Entity> {
    state
        .store
        .get(Kind::User, id)
        .await?
        .ok_or_else(|| ApiError::not_found("invalid user id"))
}

/// GET /users - a paged scan post-filtered to the caller's own record, so a
/// page may come back empty while `next` still advances the walk.
pub async fn list(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let paginator = Paginator::new(
        state.store.as_ref(),
        state.config.pagination.page_size,
        state.config.pagination.include_total_count,
    );
    let mut page = paginator.list(Kind::User, query.cursor.as_deref()).await?;
    page.items
        .retain(|entity| entity.attr_str(EMAIL_FIELD) == Some(principal.identity.as_str()));

    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::page_to_api_value(&page, Kind::User, &base_url)).into_response())
}

/// GET /users/:id
pub async fn get(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = parse_id(&id, "user")?;
    let user = load_user(&state, id).await?;
    ensure_same_identity(&user, &principal)?;

    let base_url = format::request_base_url(&headers, &state.config);
    Ok(Json(format::entity_to_api_value(&user, &base_url)).into_response())
}

/// PUT /users/:id - full overwrite of mutable attributes; the `clients`
/// reference list survives the replace.
pub async fn replace(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    let id = parse_id(&id, "user")?;
    let body: UserBody = parse_body(payload)?;

    let existing = load_user(&state, id).await?;
    ensure_same_identity(&existing, &principal)?;

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(body.name));
    attributes.insert(EMAIL_FIELD.to_string(), json!(body.email));
    attributes.insert("clientAge".to_string(), json!(body.client_age));

    let replacement = Entity {
        kind: Kind::User,
        id,
        attributes,
        references: existing.references.clone(),
        version: existing.version,
    };
    state.store.put(replacement, Some(existing.version)).await?;

    let base_url = format::request_base_url(&headers, &state.config);
    let location = format::entity_url(&base_url, Kind::User, id);
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

/// DELETE /users/:id
pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id, "user")?;
    let user = load_user(&state, id).await?;
    ensure_same_identity(&user, &principal)?;

    state.store.delete(Kind::User, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /users - signup. The provider account is created first; the local
/// User record is only persisted once the provider accepts the account.
pub async fn signup(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    if !state.config.policy.public_signup && principal.0.is_none() {
        return Err(ApiError::unauthorized("signup is not public on this deployment"));
    }
    let body: SignupBody = parse_body(payload)?;

    state.identity.signup(&body.username, &body.password).await?;

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(body.name));
    attributes.insert(EMAIL_FIELD.to_string(), json!(body.username));
    attributes.insert("clientAge".to_string(), json!(body.client_age));

    let entity = state.store.insert(Kind::User, attributes).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": entity.id }))).into_response())
}

/// POST /users/login - password grant against the identity provider; the
/// token response passes through untouched.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    let body: LoginBody = parse_body(payload)?;
    let tokens = state.identity.login(&body.username, &body.password).await?;
    Ok(Json(tokens).into_response())
}

/// PUT /users/:user_id/clients/:client_id - assign a client to a caseworker.
/// Missing entities on this route are client errors, not 404s.
pub async fn link_client(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((user_id, client_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user_id = parse_id(&user_id, "user")?;
    let client_id = parse_id(&client_id, "client")?;

    let client = state
        .store
        .get(Kind::Client, client_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid client id"))?;
    ensure_client_owner(&client, &principal)?;

    state
        .store
        .get(Kind::User, user_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid user id"))?;

    let base_url = format::request_base_url(&headers, &state.config);
    let entry = RefEntry::new(client_id, format::entity_url(&base_url, Kind::Client, client_id));
    RelationshipMaintainer::new(state.store.as_ref())
        .link(Kind::User, user_id, relation::CLIENTS, entry)
        .await?;

    Ok(Json(json!({ "message": "client added to user" })).into_response())
}

/// DELETE /users/:user_id/clients/:client_id - idempotent unlink.
pub async fn unlink_client(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((user_id, client_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let user_id = parse_id(&user_id, "user")?;
    let client_id = parse_id(&client_id, "client")?;

    let client = state
        .store
        .get(Kind::Client, client_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid client id"))?;
    ensure_client_owner(&client, &principal)?;

    state
        .store
        .get(Kind::User, user_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid user id"))?;

    RelationshipMaintainer::new(state.store.as_ref())
        .unlink(Kind::User, user_id, relation::CLIENTS, client_id)
        .await?;

    Ok(Json(json!({ "message": "client removed from user" })).into_response())
}

/// PUT|DELETE /users - not allowed on the collection root
pub async fn collection_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("GET, POST")
}

fn ensure_client_owner(client: &Entity, principal: &Principal) -> Result<(), ApiError> {
    match client.attr_str(OWNER_FIELD) {
        Some(owner) if owner == principal.identity => Ok(()),
        _ => Err(ApiError::forbidden("current user does not have permission to edit this client")),
    }
}
