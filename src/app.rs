use axum::{
    Json, Router,
    extract::{Extension, Multipart, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::assets::assign_asset_codes;
use crate::classify::apply_classifications;
use crate::config::SheetConfig;
use crate::downloader;
use crate::error::SheetError;
use crate::loader;
use crate::login;
use crate::sorting::sort_and_subtotal;
use crate::state::WorkspaceStore;
use crate::table::Table;

/// Shared application state: the per-session workspace store plus the
/// column conventions for this deployment.
pub struct AppState {
    pub store: WorkspaceStore,
    pub config: SheetConfig,
}

#[derive(Deserialize)]
struct LoadRequest {
    sheet_name: Option<String>,
    header_row: Option<usize>,
}

#[derive(Deserialize)]
struct SortRequest {
    columns: Vec<String>,
    #[serde(default = "default_order")]
    order: String,
}

fn default_order() -> String {
    "asc".to_string()
}

#[derive(Deserialize)]
struct ExtractRequest {
    columns: Vec<String>,
}

#[derive(Deserialize)]
struct QueueRequest {
    group: String,
    classification: String,
}

#[derive(Deserialize)]
struct AssetRequest {
    seed_code: String,
    #[serde(default)]
    group_columns: Vec<String>,
}

/// Start the server on `addr`.
pub async fn run(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = SheetConfig::load("config.json");
    let state = Arc::new(AppState {
        store: WorkspaceStore::new(),
        config,
    });

    // Everything behind the session gate; unauthenticated calls get a
    // JSON 401 and touch no state.
    let api = Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/load", post(load_data))
        .route("/api/table", get(get_table))
        .route("/api/columns/extract", post(extract_columns))
        .route("/api/sort", post(sort_table))
        .route("/api/classify/queue", post(queue_classification))
        .route("/api/classify/apply", post(apply_queue))
        .route("/api/assets", post(update_asset_codes))
        .route("/api/export", get(export_table))
        .route("/api/logout", post(login::handle_logout))
        .layer(middleware::from_fn(login::require_auth));

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/api/login", post(login::handle_login))
        .route("/api/signup", post(login::handle_signup))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

fn error_response(err: SheetError) -> Response {
    let status = match err {
        SheetError::Io(_) | SheetError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(json!({ "status": "error", "message": err.to_string() })),
    )
        .into_response()
}

fn no_data_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": "no data loaded" })),
    )
        .into_response()
}

/// The current table as the UI consumes it: column order, rendered
/// records, and the distinct grouping values for the classification
/// dropdown.
fn table_response(table: &Table, config: &SheetConfig) -> Response {
    Json(json!({
        "status": "ok",
        "columns": table.columns(),
        "records": table.records(),
        "groups": distinct_group_values(table, &config.group_column),
    }))
    .into_response()
}

fn distinct_group_values(table: &Table, group_column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    if let Some(idx) = table.column_index(group_column) {
        for row in table.rows() {
            let value = row.cell(idx).map(|c| c.render()).unwrap_or_default();
            if !value.is_empty() && seen.insert(value.clone()) {
                values.push(value);
            }
        }
    }
    values
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    mut multipart: Multipart,
) -> Response {
    let mut saved: Option<PathBuf> = None;

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() != Some("file") {
            continue;
        }

        // Basename only; the client controls the uploaded filename.
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .unwrap_or_default();
        let filename = Path::new(&filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let data = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": "error", "message": e.to_string() })),
                )
                    .into_response();
            }
        };

        let user_dir = PathBuf::from(&state.config.upload_dir).join(&username);
        if let Err(e) = fs::create_dir_all(&user_dir) {
            return error_response(e.into());
        }
        let path = user_dir.join(&filename);
        if let Err(e) = fs::write(&path, &data) {
            return error_response(e.into());
        }
        saved = Some(path);
    }

    match saved {
        Some(path) => {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            state
                .store
                .with(&username, |ws| ws.upload = Some(path.clone()));
            log::info!("{} uploaded {}", username, filename);
            Json(json!({ "status": "ok", "filename": filename })).into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "No file data received" })),
        )
            .into_response(),
    }
}

async fn load_data(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    Json(req): Json<LoadRequest>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| {
        let path = match ws.upload.as_ref() {
            Some(path) => path.clone(),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": "error", "message": "no file uploaded" })),
                )
                    .into_response();
            }
        };

        let (columns, records) = match loader::read_sheet(
            &path,
            req.sheet_name.as_deref(),
            req.header_row.unwrap_or(0),
        ) {
            Ok(parsed) => parsed,
            Err(e) => return error_response(e),
        };

        match Table::load(columns, records, std::slice::from_ref(&config.group_column)) {
            Ok(table) => {
                let table = ws.table.insert(table);
                ws.loaded_at = Some(Utc::now());
                table_response(table, &config)
            }
            Err(e) => error_response(e),
        }
    })
}

async fn get_table(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| match ws.table.as_ref() {
        Some(table) => table_response(table, &config),
        None => no_data_response(),
    })
}

async fn extract_columns(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| {
        let table = match ws.table.as_ref() {
            Some(table) => table,
            None => return no_data_response(),
        };
        match table.select_columns(&req.columns) {
            Ok(narrowed) => table_response(ws.table.insert(narrowed), &config),
            Err(e) => error_response(e),
        }
    })
}

async fn sort_table(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    Json(req): Json<SortRequest>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| {
        let table = match ws.table.as_ref() {
            Some(table) => table,
            None => return no_data_response(),
        };
        match sort_and_subtotal(
            table,
            &req.columns,
            req.order != "desc",
            &config.aggregate_column,
            &config.code_column,
        ) {
            Ok(sorted) => table_response(ws.table.insert(sorted), &config),
            Err(e) => error_response(e),
        }
    })
}

async fn queue_classification(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    Json(req): Json<QueueRequest>,
) -> Response {
    state.store.with(&username, |ws| {
        // Blank arguments are a silent no-op; the echoed queue tells the
        // UI what is actually pending.
        ws.pending.enqueue(&req.group, &req.classification);
        Json(json!({ "status": "ok", "pending": ws.pending.entries() })).into_response()
    })
}

async fn apply_queue(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| match ws.table.as_mut() {
        Some(table) => {
            let updates = ws.pending.drain();
            apply_classifications(
                table,
                &updates,
                &config.group_column,
                &config.classification_column,
            );
            table_response(table, &config)
        }
        None => no_data_response(),
    })
}

async fn update_asset_codes(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
    Json(req): Json<AssetRequest>,
) -> Response {
    let config = state.config.clone();
    state.store.with(&username, |ws| match ws.table.as_mut() {
        Some(table) => {
            match assign_asset_codes(
                table,
                &req.seed_code,
                &req.group_columns,
                &config.code_column,
                &config.lead_column,
            ) {
                Ok(()) => table_response(table, &config),
                Err(e) => error_response(e),
            }
        }
        None => no_data_response(),
    })
}

async fn export_table(
    State(state): State<Arc<AppState>>,
    Extension(username): Extension<String>,
) -> Response {
    let buffer = state.store.with(&username, |ws| {
        ws.table.as_ref().map(downloader::to_xlsx)
    });

    match buffer {
        Some(Ok(buffer)) => Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )
            .header(
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"updated_data.xlsx\"",
            )
            .body(axum::body::Body::from(buffer))
            .unwrap(),
        Some(Err(e)) => error_response(e),
        None => no_data_response(),
    }
}
