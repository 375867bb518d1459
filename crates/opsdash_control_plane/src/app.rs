use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use opsdash_contract::{
    Backup, CreateBackupRequest, CreatePageRequest, PageStatus, SendMessageRequest, StatusBadge,
    StatusDisplay,
};
use opsdash_lifecycle::{
    BackupEngine, LandingEngine, LifecycleError, LifecycleEvent, LifecycleResource, MessageEngine,
    Snapshot,
};
use opsdash_metrics::{backup_stats, landing_stats, message_stats};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

type ApiError = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct AppState {
    pub backups: BackupEngine,
    pub messages: MessageEngine,
    pub landing_pages: LandingEngine,
}

impl AppState {
    pub fn new(backups: BackupEngine, messages: MessageEngine, landing_pages: LandingEngine) -> Self {
        Self {
            backups,
            messages,
            landing_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetPageStatusRequest {
    status: PageStatus,
}

/// A resource as listed on a dashboard: its own fields plus the badge to draw.
#[derive(Serialize)]
struct Row<'a, T: Serialize> {
    #[serde(flatten)]
    item: &'a T,
    badge: StatusBadge,
}

/// Backup rows also carry the type chip and whether restore is offered.
#[derive(Serialize)]
struct BackupRow<'a> {
    #[serde(flatten)]
    backup: &'a Backup,
    badge: StatusBadge,
    kind_badge: StatusBadge,
    restorable: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/v1/backups", get(list_backups).post(create_backup))
        .route("/v1/backups/stats", get(get_backup_stats))
        .route("/v1/backups/{backup_id}", get(get_backup))
        .route("/v1/sms/messages", get(list_messages).post(send_message))
        .route("/v1/sms/messages/{message_id}", get(get_message))
        .route("/v1/sms/stats", get(get_message_stats))
        .route("/v1/landing-pages", get(list_pages).post(create_page))
        .route("/v1/landing-pages/stats", get(get_landing_stats))
        .route("/v1/landing-pages/{page_id}/status", put(set_page_status))
        .route("/v1/landing-pages/{page_id}/access", post(record_page_access))
        .route("/v1/events/stream", get(stream_events))
        .with_state(state)
}

async fn health_live() -> impl IntoResponse {
    Json(json!({
        "status": "live",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn list_backups(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "items": rows(&state.backups.snapshot(), backup_row) }))
}

async fn create_backup(
    State(state): State<AppState>,
    Json(payload): Json<CreateBackupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let backup = state.backups.create(payload).map_err(lifecycle_error)?;
    info!(backup_id = %backup.backup_id, location = %backup.storage_location, "backup accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "backup": &*backup,
            "status_url": format!("/v1/backups/{}", backup.backup_id)
        })),
    ))
}

async fn get_backup(
    State(state): State<AppState>,
    Path(backup_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.backups.get(&backup_id) {
        Some(backup) => Ok(Json(backup_row(&backup))),
        None => Err(not_found("backup_not_found")),
    }
}

async fn get_backup_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(backup_stats(state.backups.snapshot().as_slice()))
}

async fn list_messages(State(state): State<AppState>) -> impl IntoResponse {
    let items = rows(&state.messages.snapshot(), |message| {
        json!(Row {
            item: message,
            badge: message.send_status.badge(),
        })
    });
    Json(json!({ "items": items }))
}

async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.messages.create(payload).map_err(lifecycle_error)?;
    info!(message_id = %message.message_id, to = %message.to, "sms queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": &*message,
            "status_url": format!("/v1/sms/messages/{}", message.message_id)
        })),
    ))
}

async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.messages.get(&message_id) {
        Some(message) => Ok(Json(json!(Row {
            item: &*message,
            badge: message.send_status.badge(),
        }))),
        None => Err(not_found("message_not_found")),
    }
}

async fn get_message_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(message_stats(state.messages.snapshot().as_slice()))
}

async fn list_pages(State(state): State<AppState>) -> impl IntoResponse {
    let items = rows(&state.landing_pages.snapshot(), |page| {
        json!(Row {
            item: page,
            badge: page.status.badge(),
        })
    });
    Json(json!({ "items": items }))
}

async fn create_page(
    State(state): State<AppState>,
    Json(payload): Json<CreatePageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.landing_pages.create(payload).map_err(lifecycle_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "page": &*page }))))
}

async fn set_page_status(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(payload): Json<SetPageStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .landing_pages
        .set_status(&page_id, payload.status)
        .map_err(lifecycle_error)?;
    Ok(Json(json!({ "page": &*page })))
}

async fn record_page_access(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .landing_pages
        .record_access(&page_id)
        .map_err(lifecycle_error)?;
    Ok(Json(json!({ "page": &*page })))
}

async fn get_landing_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(landing_stats(state.landing_pages.snapshot().as_slice()))
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let merged = stream::select_all([
        lifecycle_stream(state.backups.events()),
        lifecycle_stream(state.messages.events()),
        lifecycle_stream(state.landing_pages.events()),
    ]);

    Sse::new(merged).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// SSE events named `<kind>.<change>`, e.g. `sms.status.changed`. Lagged
/// receivers skip what they missed.
fn lifecycle_stream<R>(
    receiver: broadcast::Receiver<LifecycleEvent<R>>,
) -> BoxStream<'static, Result<SseEvent, Infallible>>
where
    R: LifecycleResource + Serialize,
{
    BroadcastStream::new(receiver)
        .filter_map(|item| async move {
            let event = item.ok()?;
            let payload = json!({
                "event_id": event.event_id,
                "change": event.change,
                "at": event.at,
                "resource": &*event.resource,
            });
            let data = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default()
                .id(event.event_id.to_string())
                .event(format!("{}.{}", R::KIND, event.change.event_suffix()))
                .data(data)))
        })
        .boxed()
}

fn rows<R, F>(snapshot: &Snapshot<R>, row: F) -> Vec<Value>
where
    F: Fn(&R) -> Value,
{
    snapshot.iter().map(|item| row(&**item)).collect()
}

fn backup_row(backup: &Backup) -> Value {
    json!(BackupRow {
        backup,
        badge: backup.status.badge(),
        kind_badge: backup.backup_type.badge(),
        restorable: backup.is_restorable(),
    })
}

fn lifecycle_error(error: LifecycleError) -> ApiError {
    match error {
        LifecycleError::Validation(detail) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "validation_failed", "detail": detail.to_string() })),
        ),
        LifecycleError::NotFound { kind, id } => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{kind}_not_found"), "detail": id })),
        ),
        other @ LifecycleError::RuntimeUnavailable => {
            error!(error = %other, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal_error", "detail": other.to_string() })),
            )
        }
    }
}

fn not_found(code: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": code })))
}
