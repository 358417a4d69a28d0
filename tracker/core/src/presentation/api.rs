// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API
//!
//! Thin axum surface over the application services. Every route except
//! `GET /health` and `GET /items/{id}` requires `X-API-Key`.

use axum::extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::application::attachments::IncomingUpload;
use crate::application::{
    AssignmentLocks, AssignmentService, AttachmentService, ChoreService, ItemService,
    NotificationService, StatsService, TrackerError, UploadService, UserService,
};
use crate::domain::assignment::{Assignment, AssignmentId, AssignmentPatch, AssignmentStatus, NewAssignment};
use crate::domain::attachment::{AttachmentMeta, MAX_ATTACHMENT_BYTES};
use crate::domain::chore::{Chore, ChoreId, ChorePatch, NewChore};
use crate::domain::item::{Item, ItemId, NewItem};
use crate::domain::upload::{UploadError, UploadRecord};
use crate::domain::user::{NewUser, User};
use crate::infrastructure::file_store::ImageStore;
use crate::infrastructure::repositories::{
    InMemoryAssignmentRepository, InMemoryChoreRepository, InMemoryItemRepository,
    InMemoryUploadRepository, InMemoryUserRepository,
};
use crate::infrastructure::webhook_client::DeliveryClient;
use crate::infrastructure::webhook_config::WebhookConfigSource;
use crate::presentation::extract::{ApiJson, ApiPath, ApiQuery};
use crate::presentation::middleware::{correlation, panic_response, require_api_key, ApiKey};
use crate::presentation::problem::ApiError;

/// Request bodies up to this size are accepted (base64 attachments included).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

type ApiResult<T> = Result<T, ApiError>;

/// Runtime settings the router needs.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub attachments_dir: PathBuf,
    pub upload_dir: PathBuf,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub chores: Arc<ChoreService>,
    pub items: Arc<ItemService>,
    pub assignments: Arc<AssignmentService>,
    pub attachments: Arc<AttachmentService>,
    pub uploads: Arc<UploadService>,
    pub stats: Arc<StatsService>,
    pub api_key: ApiKey,
}

impl AppState {
    /// Wire every service over fresh in-memory repositories.
    pub fn in_memory(
        settings: ApiSettings,
        webhooks: Arc<dyn WebhookConfigSource>,
        delivery: DeliveryClient,
    ) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let chores = Arc::new(InMemoryChoreRepository::new());
        let assignments = Arc::new(InMemoryAssignmentRepository::new());
        let items = Arc::new(InMemoryItemRepository::new());
        let uploads = Arc::new(InMemoryUploadRepository::new());
        let locks = AssignmentLocks::default();
        let notifications = NotificationService::new(webhooks, delivery);

        Self {
            users: Arc::new(UserService::new(users.clone())),
            chores: Arc::new(ChoreService::new(
                chores.clone(),
                users.clone(),
                assignments.clone(),
                locks.clone(),
            )),
            items: Arc::new(ItemService::new(items)),
            assignments: Arc::new(AssignmentService::new(
                assignments.clone(),
                users.clone(),
                chores.clone(),
                notifications,
                locks,
            )),
            attachments: Arc::new(AttachmentService::new(
                chores.clone(),
                ImageStore::new(settings.attachments_dir),
            )),
            uploads: Arc::new(UploadService::new(uploads, ImageStore::new(settings.upload_dir))),
            stats: Arc::new(StatsService::new(users, chores, assignments)),
            api_key: ApiKey(settings.api_key.map(Arc::from)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/items", post(create_item))
        .route("/users", post(create_user).get(list_users))
        .route("/chores", post(create_chore).get(list_chores))
        .route("/chores/{id}", get(get_chore).put(update_chore).delete(delete_chore))
        .route("/chores/{id}/attachments", post(create_attachment))
        .route("/assignments", post(create_assignment).get(list_assignments))
        .route("/assignments/{id}", get(get_assignment).patch(update_assignment))
        .route("/assignments/{id}/notify", post(notify_assignment))
        .route("/uploads", post(create_upload))
        .route("/stats", get(get_stats))
        .route_layer(from_fn_with_state(state.api_key.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .route("/items/{id}", get(get_item))
        .merge(protected)
        .fallback(|| async { ApiError::http(StatusCode::NOT_FOUND) })
        .method_not_allowed_fallback(|| async { ApiError::http(StatusCode::METHOD_NOT_ALLOWED) })
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(correlation))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

// ============================================================================
// Items
// ============================================================================

async fn create_item(State(state): State<AppState>, ApiJson(payload): ApiJson<NewItem>) -> ApiResult<Json<Item>> {
    Ok(Json(state.items.create(payload).await?))
}

async fn get_item(State(state): State<AppState>, ApiPath(id): ApiPath<u64>) -> ApiResult<Json<Item>> {
    Ok(Json(state.items.get(ItemId(id)).await?))
}

// ============================================================================
// Users
// ============================================================================

async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    Ok((StatusCode::CREATED, Json(state.users.create(payload).await?)))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

// ============================================================================
// Chores
// ============================================================================

async fn create_chore(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewChore>,
) -> ApiResult<(StatusCode, Json<Chore>)> {
    Ok((StatusCode::CREATED, Json(state.chores.create(payload).await?)))
}

async fn list_chores(State(state): State<AppState>) -> ApiResult<Json<Vec<Chore>>> {
    Ok(Json(state.chores.list().await?))
}

async fn get_chore(State(state): State<AppState>, ApiPath(id): ApiPath<u64>) -> ApiResult<Json<Chore>> {
    Ok(Json(state.chores.get(ChoreId(id)).await?))
}

async fn update_chore(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<ChorePatch>,
) -> ApiResult<Json<Chore>> {
    Ok(Json(state.chores.update(ChoreId(id), patch).await?))
}

async fn delete_chore(State(state): State<AppState>, ApiPath(id): ApiPath<u64>) -> ApiResult<StatusCode> {
    state.chores.delete(ChoreId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    content: String,
}

async fn create_attachment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(body): ApiJson<AttachmentBody>,
) -> ApiResult<(StatusCode, Json<AttachmentMeta>)> {
    let meta = state.attachments.attach(ChoreId(id), &body.content).await?;
    Ok((StatusCode::CREATED, Json(meta)))
}

// ============================================================================
// Assignments
// ============================================================================

async fn create_assignment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewAssignment>,
) -> ApiResult<(StatusCode, Json<Assignment>)> {
    Ok((StatusCode::CREATED, Json(state.assignments.create(payload).await?)))
}

#[derive(Debug, Deserialize)]
struct AssignmentFilter {
    status: Option<AssignmentStatus>,
}

async fn list_assignments(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<AssignmentFilter>,
) -> ApiResult<Json<Vec<Assignment>>> {
    Ok(Json(state.assignments.list(filter.status).await?))
}

async fn get_assignment(State(state): State<AppState>, ApiPath(id): ApiPath<u64>) -> ApiResult<Json<Assignment>> {
    Ok(Json(state.assignments.get(AssignmentId(id)).await?))
}

async fn update_assignment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<AssignmentPatch>,
) -> ApiResult<Json<Assignment>> {
    Ok(Json(state.assignments.update(AssignmentId(id), patch).await?))
}

async fn notify_assignment(State(state): State<AppState>, ApiPath(id): ApiPath<u64>) -> ApiResult<impl IntoResponse> {
    // The delivery task is detached; its outcome is logged by the service.
    let _handle = state.assignments.notify(AssignmentId(id)).await?;
    Ok(Json(json!({"status": "queued"})))
}

// ============================================================================
// Uploads and stats
// ============================================================================

async fn create_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadRecord>)> {
    let mut multipart = multipart.map_err(|e| TrackerError::from(UploadError::Multipart(e.body_text())))?;
    let upload = read_file_field(&mut multipart).await?;
    let record = state.uploads.save(upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Read the `file` part, stopping once it is known to be oversized.
async fn read_file_field(multipart: &mut Multipart) -> Result<IncomingUpload, TrackerError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let mut upload = IncomingUpload {
            filename: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            data: Vec::new(),
        };
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            upload.data.extend_from_slice(&chunk);
            if upload.data.len() > MAX_ATTACHMENT_BYTES {
                break;
            }
        }
        return Ok(upload);
    }
    Err(UploadError::MissingFile.into())
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> TrackerError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge.into()
    } else {
        UploadError::Multipart(error.body_text()).into()
    }
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<crate::application::Stats>> {
    Ok(Json(state.stats.snapshot().await?))
}
