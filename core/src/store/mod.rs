//! Persistence engine for todos.
//!
//! # Design
//! `TodoStore` is the one interface the rest of the crate talks to. Two
//! implementations exist: `FileStore` rewrites a whole JSON document per
//! write, `PgStore` issues one parameterized statement per operation.
//! `open_store` is the only place that chooses between them; the choice is
//! made once at startup and held for the life of the process.
//!
//! List order differs between backends: the file store keeps insertion
//! order, Postgres returns the most recently created first.

mod file;
mod postgres;

pub use file::FileStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, TodoError};
use crate::secrets::SecretsProvider;
use crate::types::{NewTodo, Todo, TodoPatch};

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Short backend name, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Todo>>;

    /// Looks the todo up by scanning `list`; neither backend has a direct
    /// by-id read.
    async fn get(&self, id: Uuid) -> Result<Todo> {
        self.list()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TodoError::not_found(id))
    }

    async fn create(&self, todo: NewTodo) -> Result<Todo>;

    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Todo>;

    /// Removes the todo and returns the removed record.
    async fn delete(&self, id: Uuid) -> Result<Todo>;

    /// Releases backend resources on shutdown.
    async fn close(&self) {}
}

/// Select and open the backend for this process.
pub async fn open_store(config: &Config) -> Result<Arc<dyn TodoStore>> {
    if config.use_postgres() {
        let secrets = SecretsProvider::from_config(config);
        let db = secrets.database_config().await;
        let store = PgStore::connect(&db).await?;
        Ok(Arc::new(store))
    } else {
        tracing::info!(path = %config.data_file.display(), "Using JSON file database");
        let store = FileStore::open(&config.data_file).await?;
        Ok(Arc::new(store))
    }
}
