use crate::{
    disk::{DiskUsage, DiskUsageReport},
    dummy::{self, SIZE_LIMIT_MB},
    error::AppError,
    AppState,
};
use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(hello, disk_usage, dummy_stats, add_dummy),
    components(schemas(DiskUsageReport))
)]
pub struct ApiDoc;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DummyQuery {
    /// File size in MiB, 1 when missing or unparsable
    size: Option<String>,
}

#[utoipa::path(get, path = "/", responses((status = 200, description = "Greeting", body = String)))]
pub async fn hello(State(state): State<Arc<AppState>>) -> String {
    format!("Hello {}!\n", state.name)
}

#[utoipa::path(
    get,
    path = "/du",
    responses(
        (status = 200, description = "Disk usage of the reported filesystem", body = DiskUsageReport),
        (status = 500, description = "statvfs failed", body = String)
    )
)]
pub async fn disk_usage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DiskUsageReport>, AppError> {
    let path = state.du_path.clone();
    let usage = tokio::task::spawn_blocking(move || DiskUsage::at(&path))
        .await?
        .map_err(AppError::DiskUsage)?;
    Ok(Json(usage.report()))
}

#[utoipa::path(
    get,
    path = "/dummy",
    responses(
        (status = 200, description = "Count and total size of dummy files", body = String),
        (status = 500, description = "Reading the dummy directory failed", body = String)
    )
)]
pub async fn dummy_stats(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let dir = state.dummy_dir.clone();
    let stat = tokio::task::spawn_blocking(move || dummy::stat_dummy_files(&dir))
        .await?
        .map_err(AppError::Stats)?;
    Ok(format!("dummy files: {}\n", stat))
}

#[utoipa::path(
    get,
    path = "/dummy:add",
    params(DummyQuery),
    responses(
        (status = 200, description = "Dummy file created", body = String),
        (status = 400, description = "Requested size above the limit", body = String),
        (status = 500, description = "Creating the dummy file failed", body = String)
    )
)]
pub async fn add_dummy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DummyQuery>,
) -> Result<String, AppError> {
    // negative sizes fall back to 1MB instead of creating an empty file
    let size_mb = dummy::parse_size(query.size.as_deref());
    if size_mb > SIZE_LIMIT_MB {
        return Err(AppError::SizeLimit {
            limit: SIZE_LIMIT_MB,
            requested: size_mb,
        });
    }

    let dir = state.dummy_dir.clone();
    let stat = tokio::task::spawn_blocking(move || {
        dummy::ensure_dir(&dir).map_err(AppError::DummyDir)?;
        dummy::create_dummy_file(&dir, size_mb).map_err(AppError::CreateDummy)?;
        dummy::stat_dummy_files(&dir).map_err(AppError::Stats)
    })
    .await??;

    info!("added {}MB dummy file, {}", size_mb, stat);
    Ok(format!("dummy files: {}\n", stat))
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Routes `/dummy:add`, whose colon the path router cannot express, and
/// answers 404 for everything else.
pub async fn dummy_action(
    state: State<Arc<AppState>>,
    uri: Uri,
    query: Option<Query<DummyQuery>>,
) -> Response {
    match uri.path() {
        "/dummy:add" => add_dummy(state, query.unwrap_or(Query(DummyQuery::default())))
            .await
            .into_response(),
        _ => (StatusCode::NOT_FOUND, "404 page not found\n").into_response(),
    }
}
