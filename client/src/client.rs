//! Request builder and response parser for the todo API.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTodo, Health, Todo, UpdateTodo};

/// Synchronous, stateless client for the todo API.
///
/// The caller is responsible for executing the HTTP round-trip between
/// `build_*` and `parse_*`.
#[derive(Debug, Clone)]
pub struct TodoClient {
    api_url: String,
}

impl TodoClient {
    /// `base_url` is the server origin; routes are resolved under `/api`.
    pub fn new(base_url: &str) -> Self {
        Self {
            api_url: format!("{}/api", base_url.trim_end_matches('/')),
        }
    }

    fn todos_url(&self) -> String {
        format!("{}/todos", self.api_url)
    }

    fn todo_url(&self, id: Uuid) -> String {
        format!("{}/todos/{id}", self.api_url)
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.todos_url())
    }

    pub fn build_get_todo(&self, id: Uuid) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.todo_url(id))
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(HttpRequest::with_json(HttpMethod::Post, self.todos_url(), body))
    }

    pub fn build_update_todo(&self, id: Uuid, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(HttpRequest::with_json(HttpMethod::Put, self.todo_url(id), body))
    }

    pub fn build_delete_todo(&self, id: Uuid) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Delete, self.todo_url(id))
    }

    pub fn build_health(&self) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, format!("{}/health", self.api_url))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        parse(response, 200)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse(response, 200)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse(response, 201)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse(response, 200)
    }

    /// Returns the record the server removed.
    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse(response, 200)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<Health, ApiError> {
        parse(response, 200)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn parse<T: DeserializeOwned>(response: HttpResponse, expected: u16) -> Result<T, ApiError> {
    check_status(&response, expected)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        s if s == expected => Ok(()),
        404 => Err(ApiError::NotFound),
        400 => Err(ApiError::BadRequest(error_message(&response.body))),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Pull `error.message` out of the server's error envelope, falling back to
/// the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
