//! HTTP routes for Repair Desk.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{MethodRouter, delete, get, post};
use axum::{Json, Router};
use repairdesk_core::config::PaginationConfig;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth_svc::{AuthService, LoginRequest};
use super::comment_svc::{CommentService, NewComment, parse_request_id};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::request_svc::{ListParams, RequestService};
use super::stats_svc::StatsService;
use super::user_svc::{CreateUserRequest, UserService};
use crate::auth::{JwtManager, Principal};
use crate::error::ApiResult;
use crate::lifecycle::{NewRequest, RequestPatch};
use crate::storage::RepairDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtManager>,
    pub auth: Arc<AuthService>,
    pub requests: Arc<RequestService>,
    pub comments: Arc<CommentService>,
    pub users: Arc<UserService>,
    pub stats: Arc<StatsService>,
}

impl AppState {
    pub fn new(db: RepairDatabase, jwt: JwtManager, pagination: PaginationConfig) -> Self {
        let jwt = Arc::new(jwt);
        Self {
            auth: Arc::new(AuthService::new(db.clone(), Arc::clone(&jwt))),
            requests: Arc::new(RequestService::new(db.clone(), pagination)),
            comments: Arc::new(CommentService::new(db.clone())),
            users: Arc::new(UserService::new(db.clone())),
            stats: Arc::new(StatsService::new(db)),
            jwt,
        }
    }
}

/// Register `path` both with and without a trailing slash.
fn both(router: Router<AppState>, path: &str, handler: MethodRouter<AppState>) -> Router<AppState> {
    router
        .route(path, handler.clone())
        .route(&format!("{path}/"), handler)
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new();
    for (path, handler) in [
        ("/api/health", get(health)),
        ("/api/auth/login", post(login)),
        ("/api/auth/register", post(register)),
        ("/api/auth/me", get(me)),
        ("/api/requests", get(list_requests).post(create_request)),
        (
            "/api/requests/{id}",
            get(get_request).put(update_request).delete(delete_request),
        ),
        ("/api/comments", get(list_comments).post(create_comment)),
        ("/api/comments/{id}", delete(delete_comment)),
        ("/api/users", get(list_users).post(create_user)),
        ("/api/users/masters", get(list_masters)),
        ("/api/users/{id}", delete(delete_user)),
        ("/api/statistics", get(statistics)),
        ("/api/statistics/completed-count", get(completed_count)),
        ("/api/statistics/average-time", get(average_time)),
        ("/api/statistics/by-equipment-type", get(by_equipment_type)),
        ("/api/statistics/master-workload", get(master_workload)),
    ] {
        router = both(router, path, handler);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// --- auth ---

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.auth.login(req).await?))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let resp = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

async fn me(principal: Principal) -> impl IntoResponse {
    Json(principal)
}

// --- requests ---

async fn list_requests(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.requests.list(&principal, params).await?))
}

async fn get_request(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let view = state.requests.get(&principal, id).await?;
    Ok(Json(json!({ "data": view })))
}

async fn create_request(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(input): ApiJson<NewRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = state.requests.create(&principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Request created",
            "request_id": created.request_id,
            "request_status": created.request_status,
        })),
    ))
}

async fn update_request(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<RequestPatch>,
) -> ApiResult<impl IntoResponse> {
    let view = state.requests.update(&principal, id, patch).await?;
    Ok(Json(json!({ "message": "Request updated", "data": view })))
}

async fn delete_request(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    state.requests.delete(&principal, id).await?;
    Ok(Json(json!({ "message": "Request deleted", "request_id": id })))
}

// --- comments ---

#[derive(Debug, Deserialize)]
struct CommentQuery {
    request_id: Option<String>,
}

async fn list_comments(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> ApiResult<impl IntoResponse> {
    let request_id = parse_request_id(query.request_id.as_deref())?;
    let comments = state.comments.list(&principal, request_id).await?;
    Ok(Json(json!({ "data": comments })))
}

async fn create_comment(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(input): ApiJson<NewComment>,
) -> ApiResult<impl IntoResponse> {
    let comment = state.comments.create(&principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added", "data": comment })),
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    state.comments.delete(&principal, id).await?;
    Ok(Json(json!({ "message": "Comment deleted", "comment_id": id })))
}

// --- users ---

async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let users = state.users.list_users(&principal).await?;
    Ok(Json(json!({ "data": users })))
}

async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(input): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.create_user(&principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "data": user })),
    ))
}

async fn list_masters(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let masters = state.users.list_masters(&principal).await?;
    Ok(Json(json!({ "data": masters })))
}

async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    state.users.delete_user(&principal, id).await?;
    Ok(Json(json!({ "message": "User deleted", "user_id": id })))
}

// --- statistics (public) ---

async fn statistics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.statistics().await)
}

async fn completed_count(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "completed_requests_count": state.stats.completed_count().await }))
}

async fn average_time(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "avg_completion_days": state.stats.average_completion_days().await }))
}

async fn by_equipment_type(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.by_equipment_type().await)
}

async fn master_workload(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.master_workload().await)
}
