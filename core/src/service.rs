//! The request chain: validate, then hand off to the store.
//!
//! Errors from either step propagate unchanged; this layer only logs them.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, TodoError, ValidationError};
use crate::store::TodoStore;
use crate::types::{Todo, TodoInput};
use crate::validation::{validate_create, validate_update};

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn list_todos(&self) -> Result<Vec<Todo>> {
        tracing::info!("Fetching all todos");
        let todos = self
            .store
            .list()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error fetching todos"))?;
        tracing::info!(count = todos.len(), "Retrieved todos");
        Ok(todos)
    }

    pub async fn get_todo(&self, id: &str) -> Result<Todo> {
        let result: Result<Todo> = async { self.store.get(parse_id(id)?).await }.await;
        result.inspect_err(|e| tracing::error!(id, error = %e, "Error fetching todo by ID"))
    }

    pub async fn create_todo(&self, input: TodoInput) -> Result<Todo> {
        let result: Result<Todo> = async {
            let todo = validate_create(&input)?;
            tracing::info!(text = %todo.text, "Creating new todo");
            self.store.create(todo).await
        }
        .await;
        let todo = result.inspect_err(|e| tracing::error!(error = %e, "Error creating todo"))?;
        tracing::info!(id = %todo.id, "Todo created successfully");
        Ok(todo)
    }

    pub async fn update_todo(&self, id: &str, input: TodoInput) -> Result<Todo> {
        let result: Result<Todo> = async {
            let patch = validate_update(id, &input)?;
            let id = parse_id(id)?;
            tracing::info!(%id, text = ?patch.text, completed = ?patch.completed, "Updating todo");
            if patch.is_empty() {
                tracing::debug!(%id, "Update carries no field changes, touching updatedAt only");
            }
            self.store.update(id, patch).await
        }
        .await;
        let todo = result.inspect_err(|e| tracing::error!(id, error = %e, "Error updating todo"))?;
        tracing::info!(id = %todo.id, "Todo updated successfully");
        Ok(todo)
    }

    pub async fn delete_todo(&self, id: &str) -> Result<Todo> {
        let result: Result<Todo> = async {
            let id = parse_id(id)?;
            tracing::info!(%id, "Deleting todo");
            self.store.delete(id).await
        }
        .await;
        let todo = result.inspect_err(|e| tracing::error!(id, error = %e, "Error deleting todo"))?;
        tracing::info!(id = %todo.id, "Todo deleted successfully");
        Ok(todo)
    }
}

/// Ids are UUIDs; any other non-empty string cannot name a stored todo.
fn parse_id(id: &str) -> Result<Uuid> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::MissingId.into());
    }
    Uuid::parse_str(id).map_err(|_| TodoError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use serde_json::json;
    use std::time::Duration;

    async fn service() -> (TodoService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();
        (TodoService::new(Arc::new(store)), dir)
    }

    fn input(body: serde_json::Value) -> TodoInput {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_trimmed_text() {
        let (svc, _dir) = service().await;
        let created = svc.create_todo(input(json!({"text": "  buy milk  "}))).await.unwrap();
        let fetched = svc.get_todo(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched.text, "buy milk");
        assert!(!fetched.completed);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_then_delete_then_get_is_not_found() {
        let (svc, _dir) = service().await;
        let created = svc.create_todo(input(json!({"text": "gone soon"}))).await.unwrap();
        let id = created.id.to_string();

        let deleted = svc.delete_todo(&id).await.unwrap();
        assert_eq!(deleted, created);
        assert!(matches!(svc.get_todo(&id).await, Err(TodoError::NotFound(_))));
    }

    #[tokio::test]
    async fn completing_changes_only_completed_and_updated_at() {
        let (svc, _dir) = service().await;
        let created = svc.create_todo(input(json!({"text": "walk dog"}))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = svc
            .update_todo(&created.id.to_string(), input(json!({"completed": true})))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.text, created.text);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn updating_text_keeps_completed() {
        let (svc, _dir) = service().await;
        let created = svc
            .create_todo(input(json!({"text": "buy milk", "completed": true})))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = svc
            .update_todo(&created.id.to_string(), input(json!({"text": "buy eggs"})))
            .await
            .unwrap();
        assert_eq!(updated.text, "buy eggs");
        assert!(updated.completed);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (svc, _dir) = service().await;
        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            assert!(matches!(svc.get_todo(&id).await, Err(TodoError::NotFound(_))));
            assert!(matches!(
                svc.update_todo(&id, input(json!({"completed": true}))).await,
                Err(TodoError::NotFound(_))
            ));
            assert!(matches!(svc.delete_todo(&id).await, Err(TodoError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn empty_id_is_a_validation_error() {
        let (svc, _dir) = service().await;
        assert!(matches!(
            svc.delete_todo("").await,
            Err(TodoError::Validation(ValidationError::MissingId))
        ));
        assert!(matches!(
            svc.update_todo(" ", TodoInput::default()).await,
            Err(TodoError::Validation(ValidationError::MissingId))
        ));
    }

    #[tokio::test]
    async fn rejected_inputs_leave_store_untouched() {
        let (svc, _dir) = service().await;
        let bad = [
            json!({"text": ""}),
            json!({"text": "    "}),
            json!({"text": "x".repeat(201)}),
            json!({"completed": true}),
        ];
        for body in bad {
            let err = svc.create_todo(input(body.clone())).await.unwrap_err();
            assert!(matches!(err, TodoError::Validation(_)), "{body}");
        }
        assert!(svc.list_todos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_update_does_not_modify_record() {
        let (svc, _dir) = service().await;
        let created = svc.create_todo(input(json!({"text": "stay"}))).await.unwrap();
        let err = svc
            .update_todo(&created.id.to_string(), input(json!({"text": "", "completed": true})))
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::Validation(ValidationError::EmptyText)));
        assert_eq!(svc.get_todo(&created.id.to_string()).await.unwrap(), created);
    }
}
