use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use server_api::{create_todo, dispatch, list_todos, ApiContext};
use shared::{
    domain::Todo,
    error::{ApiError, ErrorCode},
    protocol::{MutationRequest, RPC_ROUTE, TODOS_ROUTE},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod views;

use app_state::AppState;
use config::{load_settings, normalize_database_url};

const MAX_REQUEST_BYTES: usize = 16 * 1024;

#[derive(Debug, Deserialize)]
struct NewTodoForm {
    #[serde(default)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify the path is writable"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(TODOS_ROUTE, get(http_list_todos).post(submit_new_todo))
        .route(RPC_ROUTE, post(rpc))
        .route("/assets/todo.js", get(todo_js))
        .route("/assets/app.css", get(app_css))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn index(State(state): State<Arc<AppState>>) -> (StatusCode, Html<String>) {
    match list_todos(&state.api).await {
        Ok(todos) => (StatusCode::OK, Html(views::render_page(&todos))),
        Err(e) => (
            status_for(e.code),
            Html(views::render_error_page(&e.message)),
        ),
    }
}

async fn submit_new_todo(
    State(state): State<Arc<AppState>>,
    Form(form): Form<NewTodoForm>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let Some(title) = form.title else {
        debug!("new todo form submitted without a title");
        return Ok(Redirect::to("/"));
    };

    match create_todo(&state.api, &title).await {
        Ok(_) => {}
        Err(e) if e.code == ErrorCode::Validation => {
            debug!(reason = %e.message, "ignoring invalid new todo form");
        }
        Err(e) => {
            return Err((
                status_for(e.code),
                Html(views::render_error_page(&e.message)),
            ))
        }
    }
    Ok(Redirect::to("/"))
}

async fn http_list_todos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Todo>>, (StatusCode, Json<ApiError>)> {
    let todos = list_todos(&state.api)
        .await
        .map_err(|e| (status_for(e.code), Json(e)))?;
    Ok(Json(todos))
}

async fn rpc(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> Result<Json<Todo>, (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
        )
    })?;
    let method = request.method();
    let todo = dispatch(&state.api, request).await.map_err(|e| {
        debug!(method, code = ?e.code, message = %e.message, "rpc call rejected");
        (status_for(e.code), Json(e))
    })?;
    Ok(Json(todo))
}

async fn todo_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        views::TODO_JS,
    )
}

async fn app_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], views::APP_CSS)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
