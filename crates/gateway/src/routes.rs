use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use common::types::Health;
use service::rpc::{
    BlockUserRequest, CreateUserRequest, GetUserRequest, UnblockUserRequest, UpdateContactRequest, UpdateUserRequest,
    UserResponse,
};

use crate::backend::SharedBackend;
use crate::errors::GatewayError;
use crate::observability;

type Reply = Result<Json<UserResponse>, GatewayError>;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (axum::http::StatusCode, String) {
    observability::encode_metrics()
}

async fn create_user(
    State(backend): State<SharedBackend>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Reply {
    let Json(req) = body?;
    Ok(Json(backend.create_user(req).await?))
}

async fn update_user(
    State(backend): State<SharedBackend>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Reply {
    let Path(id) = id?;
    let Json(mut req) = body?;
    req.id = id;
    Ok(Json(backend.update_user(req).await?))
}

async fn block_user(State(backend): State<SharedBackend>, id: Result<Path<String>, PathRejection>) -> Reply {
    let Path(id) = id?;
    Ok(Json(backend.block_user(BlockUserRequest { id }).await?))
}

async fn unblock_user(State(backend): State<SharedBackend>, id: Result<Path<String>, PathRejection>) -> Reply {
    let Path(id) = id?;
    Ok(Json(backend.unblock_user(UnblockUserRequest { id }).await?))
}

async fn update_contact(
    State(backend): State<SharedBackend>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> Reply {
    let Path(id) = id?;
    let Json(mut req) = body?;
    req.id = id;
    Ok(Json(backend.update_contact(req).await?))
}

async fn get_user(
    State(backend): State<SharedBackend>,
    query: Result<Query<GetUserRequest>, QueryRejection>,
) -> Reply {
    let Query(req) = query?;
    Ok(Json(backend.get_user(req).await?))
}

/// Build the HTTP/JSON router: one route per RPC method plus health and metrics.
///
/// Handlers only translate. Path ids override any id in the body, and every
/// outcome of the backend is passed through [`GatewayError`].
pub fn build_router(backend: SharedBackend, cors: CorsLayer) -> Router {
    let users = Router::new()
        .route("/v1/users", post(create_user).get(get_user))
        .route("/v1/users/:id", put(update_user))
        .route("/v1/users/:id/block", post(block_user))
        .route("/v1/users/:id/unblock", post(unblock_user))
        .route("/v1/users/:id/contact", put(update_contact))
        .route_layer(middleware::from_fn(observability::track_metrics))
        .with_state(backend);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(users)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
