use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::TodoStore;
use crate::error::{Result, TodoError};
use crate::types::{NewTodo, Todo, TodoPatch};

/// On-disk layout: `{ "todos": [ ... ] }`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    todos: Vec<Todo>,
}

/// JSON-file backend. Every operation reads the whole document; writes
/// rewrite it in full.
///
/// Read-modify-write sequences hold `write_lock`, so writers in this process
/// never lose each other's updates. Other processes sharing the file are not
/// coordinated with.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories and an empty
    /// document if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&path).await? {
            write_document(&path, &Document::default()).await?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Document> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write(&self, doc: &Document) -> Result<()> {
        write_document(&self.path, doc).await
    }
}

/// Replace the document in one rename so unlocked readers never see a
/// half-written file.
async fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl TodoStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        Ok(self.read().await?.todos)
    }

    async fn create(&self, todo: NewTodo) -> Result<Todo> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let now = Utc::now();
        let todo = Todo {
            id: Uuid::new_v4(),
            text: todo.text,
            completed: todo.completed,
            created_at: now,
            updated_at: now,
        };
        doc.todos.push(todo.clone());
        self.write(&doc).await?;
        Ok(todo)
    }

    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Todo> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let todo = doc
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TodoError::not_found(id))?;
        if let Some(text) = patch.text {
            todo.text = text;
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        todo.updated_at = Utc::now().max(todo.created_at);
        let updated = todo.clone();
        self.write(&doc).await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Todo> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let index = doc
            .todos
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TodoError::not_found(id))?;
        let removed = doc.todos.remove(index);
        self.write(&doc).await?;
        Ok(removed)
    }
}
