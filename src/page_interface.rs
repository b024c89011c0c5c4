// Page HTTP interface - REST endpoints over the page service

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::{
    app_state::AppState,
    content::render_markdown,
    error::{AppError, AppResult},
    infrastructure::{middleware::Viewer, PageQuery, TrashedScope},
    models::{AuditRecord, PageInput, PageResource, PageVersion},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub trashed: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowParams {
    pub trashed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkdownRequest {
    pub content: String,
}

fn parse_scope(trashed: Option<&str>) -> AppResult<TrashedScope> {
    match trashed {
        None | Some("") => Ok(TrashedScope::Default),
        Some("with") => Ok(TrashedScope::WithTrashed),
        Some("only") => Ok(TrashedScope::OnlyTrashed),
        Some(other) => Err(AppError::BadRequest(format!(
            "trashed must be 'with' or 'only', got '{}'",
            other
        ))),
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(name: &str, value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", name, value)))
}

async fn list_pages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<PageResource>>> {
    let query = PageQuery {
        scope: parse_scope(params.trashed.as_deref())?,
        search: params.search,
        tag: params.tag,
        limit: params.limit,
    };
    Ok(Json(state.page_service.list(&query).await?))
}

async fn create_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(input): Json<PageInput>,
) -> AppResult<impl IntoResponse> {
    info!("[{}] Creating page: {}", viewer.request_id, input.title);
    let page = state.page_service.create(input, &viewer).await?;
    let resource = state.page_service.resource(&page).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn show_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ShowParams>,
) -> AppResult<Json<PageResource>> {
    let scope = parse_scope(params.trashed.as_deref())?;
    Ok(Json(state.page_service.show(id, scope).await?))
}

async fn update_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(input): Json<PageInput>,
) -> AppResult<Json<PageResource>> {
    let page = state.page_service.update(id, input, &viewer).await?;
    Ok(Json(state.page_service.resource(&page).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<PageResource>> {
    let page = state.page_service.delete(id, &viewer).await?;
    Ok(Json(state.page_service.resource(&page).await?))
}

async fn restore_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<PageResource>> {
    let page = state.page_service.restore(id, &viewer).await?;
    Ok(Json(state.page_service.resource(&page).await?))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<PageVersion>>> {
    Ok(Json(state.page_service.versions(id).await?))
}

async fn revert_version(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((id, version)): Path<(i64, i64)>,
) -> AppResult<Json<PageResource>> {
    let page = state.page_service.revert(id, version, &viewer).await?;
    Ok(Json(state.page_service.resource(&page).await?))
}

async fn list_audits(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<AuditRecord>>> {
    Ok(Json(state.page_service.audits(id).await?))
}

async fn get_tags(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    let page = state.page_service.find(id, TrashedScope::WithTrashed).await?;
    let resource = state.page_service.resource(&page).await?;
    Ok(Json(json!({ "tags": resource.tags })))
}

async fn retag_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TagsRequest>,
) -> AppResult<Json<Value>> {
    let tags = state.page_service.retag(id, &request.tags).await?;
    Ok(Json(json!({ "tags": tags })))
}

async fn tag_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TagsRequest>,
) -> AppResult<Json<Value>> {
    let tags = state.page_service.tag(id, &request.tags).await?;
    Ok(Json(json!({ "tags": tags })))
}

async fn untag_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TagsRequest>,
) -> AppResult<Json<Value>> {
    let tags = state.page_service.untag(id, &request.tags).await?;
    Ok(Json(json!({ "tags": tags })))
}

async fn get_meta(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Map<String, Value>>> {
    Ok(Json(state.page_service.meta(id).await?))
}

async fn set_meta(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(entries): Json<Map<String, Value>>,
) -> AppResult<Json<Map<String, Value>>> {
    Ok(Json(state.page_service.set_meta(id, entries).await?))
}

async fn list_views(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ViewParams>,
) -> AppResult<Json<Value>> {
    let start = parse_date("startDate", params.start_date.as_deref())?;
    let end = parse_date("endDate", params.end_date.as_deref())?;
    let views = state.page_service.views(id, start, end).await?;
    Ok(Json(json!({ "count": views.len(), "views": views })))
}

async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let view = state.page_service.record_view(id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn raw_page(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<impl IntoResponse> {
    let client = state.raw_content.as_ref().ok_or_else(|| {
        AppError::RemoteUnavailable("Raw content repository is not configured".to_string())
    })?;
    match client.fetch(&path).await? {
        Some(body) => Ok(body),
        None => Err(AppError::NotFound(format!("Raw page {} not found", path))),
    }
}

async fn markdown(Json(request): Json<MarkdownRequest>) -> Json<Value> {
    Json(json!({ "html": render_markdown(&request.content) }))
}

/// Router for every page endpoint; nest under `/api/v1`.
pub fn create_page_router(state: AppState) -> Router {
    Router::new()
        .route("/pages", get(list_pages).post(create_page))
        .route("/pages/{id}", get(show_page).put(update_page).delete(delete_page))
        .route("/pages/{id}/restore", post(restore_page))
        .route("/pages/{id}/versions", get(list_versions))
        .route("/pages/{id}/versions/{version}/revert", post(revert_version))
        .route("/pages/{id}/audits", get(list_audits))
        .route(
            "/pages/{id}/tags",
            get(get_tags).put(retag_page).post(tag_page).delete(untag_page),
        )
        .route("/pages/{id}/meta", get(get_meta).put(set_meta))
        .route("/pages/{id}/views", get(list_views).post(record_view))
        .route("/raw/{*path}", get(raw_page))
        .route("/markdown", post(markdown))
        .with_state(state)
}
