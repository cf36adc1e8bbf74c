use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{clients, programs, users};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(client_routes())
        .merge(program_routes())
        .merge(user_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/clients",
            get(clients::list)
                .post(clients::create)
                .put(clients::collection_method_not_allowed)
                .delete(clients::collection_method_not_allowed),
        )
        .route(
            "/clients/:id",
            get(clients::get).put(clients::replace).delete(clients::delete),
        )
        // Program enrollment
        .route(
            "/clients/:client_id/programs/:program_id",
            put(clients::link_program).delete(clients::unlink_program),
        )
}

fn program_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/programs",
            get(programs::list)
                .post(programs::create)
                .put(programs::collection_method_not_allowed)
                .delete(programs::collection_method_not_allowed),
        )
        .route(
            "/programs/:id",
            get(programs::get).put(programs::replace).delete(programs::delete),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(users::list)
                .post(users::signup)
                .put(users::collection_method_not_allowed)
                .delete(users::collection_method_not_allowed),
        )
        .route("/users/login", post(users::login))
        .route(
            "/users/:id",
            get(users::get).put(users::replace).delete(users::delete),
        )
        // Caseload assignment
        .route(
            "/users/:user_id/clients/:client_id",
            put(users::link_client).delete(users::unlink_client),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Casework API",
        "version": version,
        "description": "Case-management REST API for clients, caseworkers, and programs",
        "endpoints": {
            "clients": "/clients[/:id] (list public, rest owner-scoped)",
            "client_programs": "/clients/:clientID/programs/:programID (PUT/DELETE)",
            "programs": "/programs[/:id] (catalog visibility per deployment policy)",
            "users": "/users[/:id] (scoped to the authenticated caseworker)",
            "user_clients": "/users/:userID/clients/:clientID (PUT/DELETE)",
            "signup": "POST /users",
            "login": "POST /users/login",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "store": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "store_error": e.to_string()
            })),
        ),
    }
}
