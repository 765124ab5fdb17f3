pub mod error;

use std::future::Future;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use todo_core::{Environment, Todo, TodoInput, TodoService};
use tokio::net::TcpListener;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    service: TodoService,
    environment: Environment,
}

/// All routes live under `/api`.
pub fn app(service: TodoService, environment: Environment) -> Router {
    let state = AppState {
        service,
        environment,
    };
    let api = Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .route("/health", get(health));
    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Todo API request"
    );
    response
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.service.list_todos().await?))
}

async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<TodoInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = state.service.create_todo(todo_input(body)?).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.service.get_todo(&id).await?))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TodoInput>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.service.update_todo(&id, todo_input(body)?).await?))
}

/// A request without a JSON content type carries no fields. Any other body
/// the extractor rejects is a client error in the API's envelope.
fn todo_input(body: Result<Json<TodoInput>, JsonRejection>) -> Result<TodoInput, ApiError> {
    match body {
        Ok(Json(input)) => Ok(input),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(TodoInput::default()),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.service.delete_todo(&id).await?))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": "todo-server",
        "environment": state.environment.as_str(),
        "storage": state.service.backend(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
